use crate::error::AppError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

pub const JPEG_MIME_TYPE: &str = "image/jpeg";

/// An image sent inline with a model request.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub mime_type: &'static str,
    /// Base64 (standard alphabet, padded).
    pub data: String,
}

impl InlineImage {
    /// Every upload is labelled as JPEG regardless of its real format; the
    /// hosted model sniffs the content itself.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            mime_type: JPEG_MIME_TYPE,
            data: STANDARD.encode(bytes),
        }
    }
}

/// A single multimodal request: the instruction text followed by the images in order.
#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub prompt: String,
    pub images: Vec<InlineImage>,
}

#[async_trait]
pub trait FaceOracle: Send + Sync {
    /// Submits the request and returns the model's raw reply text.
    async fn compare(&self, request: &OracleRequest) -> Result<String, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_images_are_base64_jpeg() {
        let image = InlineImage::jpeg(b"\xff\xd8\xff");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.data, "/9j/");
    }
}
