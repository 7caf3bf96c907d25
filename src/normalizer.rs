use crate::error::AppError;
use serde::Serialize;
use serde_json::{Map, Number, Value};

pub const NO_JSON_FOUND: &str = "Failed to parse oracle response - no JSON found";

const SCHEMA_FIELDS: [&str; 6] = [
    "image1_description",
    "image2_description",
    "similarity_score",
    "confidence",
    "explanation",
    "verdict",
];

/// The model's verdict, kept exactly as the model produced it.
///
/// Fields are not validated; a reply that omits some of them still yields a
/// result, so consumers must treat every key as optional.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ComparisonResult(Map<String, Value>);

impl ComparisonResult {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn similarity_score(&self) -> Option<&Number> {
        match self.0.get("similarity_score") {
            Some(Value::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// Adds the names of the compared images and, when the score is numeric,
    /// a `percentage` mirroring it.
    pub fn with_images(mut self, image1: &str, image2: &str) -> Self {
        self.0.insert("image1".into(), Value::String(image1.into()));
        self.0.insert("image2".into(), Value::String(image2.into()));
        if let Some(score) = self.similarity_score().cloned() {
            self.0.insert("percentage".into(), Value::Number(score));
        }
        self
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        SCHEMA_FIELDS
            .iter()
            .copied()
            .filter(|f| !self.0.contains_key(*f))
            .collect()
    }
}

/// Greedy match from the first `{` to the last `}`.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn normalize(raw: &str) -> Result<ComparisonResult, AppError> {
    let text = raw.trim();

    let Some(json) = extract_json_object(text) else {
        log::warn!("Model reply contained no JSON object");
        return Err(AppError::Parse {
            message: NO_JSON_FOUND.into(),
            raw_response: text.into(),
        });
    };

    let object: Map<String, Value> = serde_json::from_str(json).map_err(|e| {
        log::warn!("Model reply JSON did not parse: {}", e);
        AppError::Parse {
            message: format!("Failed to parse oracle response as JSON: {}", e),
            raw_response: raw.into(),
        }
    })?;

    // An "error" key in the model's own object is data, not a failure of this service.
    let result = ComparisonResult(object);
    let missing = result.missing_fields();
    if !missing.is_empty() {
        log::warn!("Model reply is missing fields: {:?}", missing);
    }
    match result.similarity_score().and_then(Number::as_f64) {
        Some(score) if !(0.0..=100.0).contains(&score) => {
            log::warn!("Model similarity score {} is outside 0-100", score);
        }
        None => log::warn!("Model similarity score is not numeric"),
        _ => {}
    }

    Ok(result)
}
