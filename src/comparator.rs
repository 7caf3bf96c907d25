use crate::error::AppError;
use crate::normalizer::{self, ComparisonResult};
use crate::oracle::{FaceOracle, InlineImage, OracleRequest};
use crate::storage::ImageStore;
use std::sync::Arc;

pub const COMPARISON_PROMPT: &str = r#"You are an expert at analyzing facial images for biometric comparison. You are given two face images.
Analyze both images and decide whether they show the same person.

Focus on:
1. Facial structure (jawline, cheekbones, forehead)
2. Eye shape and placement
3. Nose shape and size
4. Mouth and lip characteristics
5. Facial proportions

IMPORTANT: Respond ONLY with a valid JSON object in exactly this format:
{"image1_description": "Brief description of the face in image 1", "image2_description": "Brief description of the face in image 2", "similarity_score": 75, "confidence": "high", "explanation": "Brief explanation of your reasoning", "verdict": "Same Person"}

similarity_score is an integer from 0 to 100:
- 0-30: Very different faces
- 31-50: Probably different faces
- 51-70: Possibly the same person
- 71-85: Likely the same person
- 86-100: Very likely the same person

Do not include any other text, markdown, or formatting. Only return the JSON object."#;

pub struct Comparator {
    store: ImageStore,
    oracle: Arc<dyn FaceOracle>,
}

impl Comparator {
    pub fn new(store: ImageStore, oracle: Arc<dyn FaceOracle>) -> Self {
        Self { store, oracle }
    }

    /// One model round-trip per call. Transport failures are returned as-is;
    /// nothing is retried or cached.
    pub async fn compare(&self, image1: &str, image2: &str) -> Result<ComparisonResult, AppError> {
        log::info!("Comparing {} with {}", image1, image2);

        let first = self.load(image1).await?;
        let second = self.load(image2).await?;

        let request = OracleRequest {
            prompt: COMPARISON_PROMPT.to_string(),
            images: vec![InlineImage::jpeg(&first), InlineImage::jpeg(&second)],
        };

        let raw = self.oracle.compare(&request).await?;
        log::debug!("Model reply for {} / {}: {}", image1, image2, raw);

        let result = normalizer::normalize(&raw)?.with_images(image1, image2);
        log::info!(
            "Comparison of {} with {} scored {:?}, verdict {:?}",
            image1,
            image2,
            result.similarity_score(),
            result.get("verdict")
        );
        Ok(result)
    }

    async fn load(&self, filename: &str) -> Result<Vec<u8>, AppError> {
        self.store.read(filename).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound("One or both images not found".into()),
            other => other,
        })
    }
}
