use crate::config::OracleConfig;
use crate::error::AppError;
use crate::oracle::{FaceOracle, OracleRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// Google Gemini `generateContent` client.
pub struct GeminiClient {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: &OracleConfig) -> Result<Self, AppError> {
        log::debug!("Creating Gemini client for {} at {}", config.model, config.base_url);
        let endpoint = Url::parse(&config.base_url)?
            .join(&format!("v1beta/models/{}:generateContent", config.model))?;
        if config.api_key.is_empty() {
            log::warn!("No model API key configured; comparisons will be rejected upstream.");
        }
        Ok(Self {
            client: Client::new(),
            endpoint,
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn build_request(request: &OracleRequest) -> GenerateContentRequest<'_> {
    let mut parts = vec![Part::Text { text: &request.prompt }];
    parts.extend(request.images.iter().map(|image| Part::Inline {
        inline_data: InlineData {
            mime_type: image.mime_type,
            data: &image.data,
        },
    }));
    GenerateContentRequest {
        contents: vec![Content { parts }],
    }
}

/// Concatenated text of the first candidate.
fn reply_text(body: &str) -> Result<String, AppError> {
    let processing_error = |detail: String| AppError::Parse {
        message: format!("Error processing oracle response: {}", detail),
        raw_response: body.to_string(),
    };

    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| processing_error(e.to_string()))?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(processing_error("reply contained no text".into()));
    }
    Ok(text)
}

#[async_trait]
impl FaceOracle for GeminiClient {
    async fn compare(&self, request: &OracleRequest) -> Result<String, AppError> {
        log::debug!(
            "Sending comparison with {} images to {}",
            request.images.len(),
            self.endpoint
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_request(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            log::error!("Gemini returned {}: {}", status, body);
            return Err(AppError::OracleStatus {
                status: status.as_u16(),
                body,
            });
        }

        log::trace!("Gemini response body: {}", body);
        reply_text(&body)
    }
}
