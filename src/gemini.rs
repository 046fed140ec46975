use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::media;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const IMAGE_MODEL: &str = "gemini-2.5-flash-image-preview";

pub const DEFAULT_VARIATION_COUNT: usize = 3;

/// One encoded image: base64 data plus its mime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePayload {
    pub data: String,
    pub mime_type: String,
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("invalid generation input: {0}")]
    InvalidInput(String),
    #[error("the model returned no candidates")]
    NoCandidates,
    #[error("the request was blocked by the provider's safety filter")]
    SafetyBlocked,
    #[error("no image was generated in the response")]
    NoImage,
    #[error("image generation request failed: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Seam to the multimodal generation endpoint. The production implementation
/// is [`GeminiClient`]; tests substitute a scripted double.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerateError>;
}

pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: Url) -> Self {
        let mut client = Self::new(api_key);
        client.base_url = base_url.as_str().trim_end_matches('/').to_string();
        client
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{IMAGE_MODEL}:generateContent", self.base_url)
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate_content(
        &self,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerateError> {
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| GenerateError::Provider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerateError::Provider(format!("{status} {text}")));
        }
        response
            .json()
            .await
            .map_err(|err| GenerateError::Provider(err.to_string()))
    }
}

fn request_for(source: &ImagePayload, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    inline_data: Some(InlineData {
                        mime_type: source.mime_type.clone(),
                        data: source.data.clone(),
                    }),
                    ..Default::default()
                },
                Part {
                    text: Some(prompt.to_string()),
                    ..Default::default()
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["IMAGE".to_string(), "TEXT".to_string()],
        },
    }
}

/// Classifies a provider response into one image payload or a specific
/// failure. The endpoint produces four shapes (no candidates, a safety
/// rejection, a text-only candidate, an image-bearing candidate); each maps
/// to exactly one outcome.
pub fn extract_image(response: GenerateContentResponse) -> Result<ImagePayload, GenerateError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(GenerateError::NoCandidates)?;
    if matches!(
        candidate.finish_reason.as_deref(),
        Some("SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT")
    ) {
        return Err(GenerateError::SafetyBlocked);
    }
    let parts = candidate.content.map(|content| content.parts).unwrap_or_default();
    for part in parts {
        if let Some(inline) = part.inline_data {
            if inline.mime_type.starts_with("image/") {
                return Ok(ImagePayload {
                    data: inline.data,
                    mime_type: inline.mime_type,
                });
            }
        }
    }
    Err(GenerateError::NoImage)
}

/// Produces `count` styled variations of `source`, each independently derived
/// from the same source image and prompt.
///
/// Requests are issued strictly one at a time: the image endpoint rejects
/// concurrent bursts with rate-limit errors, so a concurrency limit of one
/// is part of the contract. The first failed request aborts the batch;
/// partial results are never returned. Every call performs fresh remote
/// work; responses are not cached.
pub async fn generate_variations(
    model: &dyn ImageModel,
    source: &ImagePayload,
    prompt: &str,
    count: usize,
) -> Result<Vec<ImagePayload>, GenerateError> {
    if count == 0 {
        return Err(GenerateError::InvalidInput(
            "variation count must be at least 1".to_string(),
        ));
    }
    if source.data.trim().is_empty() {
        return Err(GenerateError::InvalidInput(
            "source image is empty".to_string(),
        ));
    }
    if !media::is_supported_image(&source.mime_type) {
        return Err(GenerateError::InvalidInput(format!(
            "unsupported image type '{}'",
            source.mime_type
        )));
    }

    let request = request_for(source, prompt);
    let mut variations = Vec::with_capacity(count);
    for index in 0..count {
        debug!(index, count, "requesting image variation");
        let response = model.generate_content(request.clone()).await?;
        variations.push(extract_image(response)?);
    }
    Ok(variations)
}
