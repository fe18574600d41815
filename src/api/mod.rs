//! HTTP contracts of the generation backend
//!
//! Thin typed wrapper over the four endpoints the coordinator uses:
//! streamed full generation, one-shot image/copy regeneration, and the
//! multipart product-image upload. Every request carries the bearer
//! credential when one is configured.

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::content::{CopyBlock, ImageBlock, Strategy};

const GENERATE_STREAM_PATH: &str = "/api/content/generate-stream";
const REGENERATE_IMAGE_PATH: &str = "/api/content/regenerate/image";
const REGENERATE_COPY_PATH: &str = "/api/content/regenerate/copy";
const UPLOAD_PRODUCT_IMAGE_PATH: &str = "/api/upload/product-image";

const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
const ALLOWED_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("server reported failure: {0}")]
    Server(String),

    #[error("response carried no data")]
    MissingData,

    #[error("invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("attachment io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Full-generation request body (also used for `all` regeneration).
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateRequest {
    pub product_name: String,
    pub product_description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image_path: Option<String>,
    pub target_ages: Vec<String>,
    pub target_genders: Vec<String>,
    pub target_interests: Vec<String>,
    pub copy_tone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regenerate_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_request: Option<String>,
}

/// Image-only regeneration: echoes the prior artifact so the backend
/// can keep copy and targets stable while redoing the image.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerateImageRequest {
    pub product_name: String,
    pub product_description: String,
    pub category: String,
    pub target_ages: Vec<String>,
    pub target_genders: Vec<String>,
    pub target_interests: Vec<String>,
    pub selected_strategy: Strategy,
    pub copy: CopyBlock,
    pub image: ImageBlock,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image_path: Option<String>,
    pub copy_text: String,
    pub image_prompt: String,
    // Backend reads this one in camelCase.
    #[serde(rename = "customPrompt", skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

/// Copy-only regeneration: product/target/tone fields plus the strategy
/// the copy must stay aligned with.
#[derive(Debug, Clone, Serialize)]
pub struct RegenerateCopyRequest {
    pub product_name: String,
    pub product_description: String,
    pub category: String,
    pub target_ages: Vec<String>,
    pub target_genders: Vec<String>,
    pub target_interests: Vec<String>,
    pub copy_tone: String,
    pub strategy_name: String,
    pub core_message: String,
    pub selected_strategy: Strategy,
    pub image: ImageBlock,
}

/// One-shot response envelope: `{success, data, message}`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Envelope {
    /// Unwrap the data payload, turning `success: false` into
    /// [`ApiError::Server`] with the server's message.
    pub fn into_data(self) -> Result<Value, ApiError> {
        if !self.success {
            return Err(ApiError::Server(
                self.message.unwrap_or_else(|| "요청 처리에 실패했습니다".into()),
            ));
        }
        self.data.ok_or(ApiError::MissingData)
    }
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(format!("{}{}", self.base_url, path));
        if let Some(ref token) = self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder
    }

    /// Open the streamed generation endpoint. The returned response
    /// body is consumed by the stream client.
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<reqwest::Response, ApiError> {
        tracing::info!(product = %request.product_name, "opening generation stream");
        let response = self
            .post(GENERATE_STREAM_PATH)
            .header("Accept", "text/event-stream")
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response)
    }

    pub async fn regenerate_image(
        &self,
        request: &RegenerateImageRequest,
    ) -> Result<Value, ApiError> {
        tracing::info!("requesting image-only regeneration");
        let envelope: Envelope = self
            .post(REGENERATE_IMAGE_PATH)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        envelope.into_data()
    }

    pub async fn regenerate_copy(
        &self,
        request: &RegenerateCopyRequest,
    ) -> Result<Value, ApiError> {
        tracing::info!(tone = %request.copy_tone, "requesting copy-only regeneration");
        let envelope: Envelope = self
            .post(REGENERATE_COPY_PATH)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        envelope.into_data()
    }

    /// Upload a product image and return the stored-asset path the
    /// backend hands back (`data.file_path`).
    pub async fn upload_product_image(
        &self,
        path: &Path,
        file_name: &str,
    ) -> Result<String, ApiError> {
        validate_image_file(path, file_name)?;

        let bytes = tokio::fs::read(path).await?;
        if bytes.len() as u64 > MAX_UPLOAD_BYTES {
            return Err(ApiError::InvalidAttachment(
                "파일 크기는 10MB 이하여야 합니다".into(),
            ));
        }

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        tracing::info!(file = %file_name, "uploading product image");
        let envelope: Envelope = self
            .post(UPLOAD_PRODUCT_IMAGE_PATH)
            .multipart(form)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let data = envelope.into_data()?;
        data.get("file_path")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ApiError::MissingData)
    }
}

/// Client-side validation mirroring the backend's rules, so obviously
/// bad files never hit the wire.
fn validate_image_file(path: &Path, file_name: &str) -> Result<(), ApiError> {
    if file_name.is_empty() {
        return Err(ApiError::InvalidAttachment("파일명이 없습니다".into()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !ALLOWED_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::InvalidAttachment(format!(
            "허용되지 않는 파일 형식입니다: .{}",
            extension
        )));
    }
    Ok(())
}
