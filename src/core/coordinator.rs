//! Generation coordinator
//!
//! Single entry point for generate and regenerate operations. Owns the
//! collected answers and the cached artifact; every mutation of either
//! happens inside this module's success handlers. The contract is one
//! operation in flight at a time - starting a new streamed generation
//! cancels a stream the caller abandoned rather than letting two runs
//! race for the cache.

use async_trait::async_trait;
use futures::{pin_mut, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::api::{
    ApiClient, ApiError, GenerateRequest, RegenerateCopyRequest, RegenerateImageRequest,
};
use crate::content::GeneratedArtifact;
use crate::dialog::CollectedInfo;
use crate::intent::RegenerateOp;
use crate::stream::{self, StreamError, StreamEvent};

const DEFAULT_CATEGORY: &str = "other";
const DEFAULT_TONE: &str = "professional";
const DEFAULT_GENDERS: [&str; 2] = ["여성", "남성"];

/// Binary asset waiting to be uploaded before the next full generation.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: String,
    pub path: std::path::PathBuf,
}

/// Contract for turning a pending binary asset into a stored-asset
/// reference before generation.
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload_product_image(&self, upload: &PendingUpload) -> Result<String, ApiError>;
}

#[async_trait]
impl UploadGateway for ApiClient {
    async fn upload_product_image(&self, upload: &PendingUpload) -> Result<String, ApiError> {
        ApiClient::upload_product_image(self, &upload.path, &upload.file_name).await
    }
}

/// Extra inputs for a regeneration pass.
#[derive(Debug, Clone, Default)]
pub struct RegenerateParams {
    /// Free text forwarded to the backend so it can honor intent beyond
    /// the coarse operation tag.
    pub custom_request: Option<String>,
    /// Explicit tone override (tone-change submenu).
    pub tone: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("server error: {0}")]
    Server(String),

    #[error("malformed artifact payload: {0}")]
    BadArtifact(#[from] serde_json::Error),

    #[error("no artifact to regenerate from")]
    NoArtifact,
}

impl GenerateError {
    /// User-facing conversational message. Server-reported messages are
    /// surfaced verbatim; everything else gets a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            GenerateError::Server(message) | GenerateError::Api(ApiError::Server(message)) => {
                message.clone()
            }
            GenerateError::Stream(StreamError::Cancelled) => "요청이 취소되었습니다.".into(),
            GenerateError::NoArtifact => {
                "수정할 콘텐츠가 아직 없습니다. 먼저 콘텐츠를 생성해주세요.".into()
            }
            _ => "죄송합니다. 콘텐츠 생성 중 오류가 발생했습니다. 다시 시도해주세요.".into(),
        }
    }
}

pub struct GenerationCoordinator {
    api: ApiClient,
    uploader: Box<dyn UploadGateway>,
    info: CollectedInfo,
    artifact: Option<GeneratedArtifact>,
    pending_upload: Option<PendingUpload>,
    /// Token of the in-flight stream, if any.
    cancel: Option<CancellationToken>,
}

impl GenerationCoordinator {
    pub fn new(api: ApiClient) -> Self {
        let uploader = Box::new(api.clone());
        Self {
            api,
            uploader,
            info: CollectedInfo::default(),
            artifact: None,
            pending_upload: None,
            cancel: None,
        }
    }

    /// Swap the upload collaborator (alternative storage, tests).
    pub fn with_upload_gateway(mut self, uploader: Box<dyn UploadGateway>) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn info(&self) -> &CollectedInfo {
        &self.info
    }

    /// The dialog engine writes canonicalized answers through this.
    pub fn info_mut(&mut self) -> &mut CollectedInfo {
        &mut self.info
    }

    pub fn artifact(&self) -> Option<&GeneratedArtifact> {
        self.artifact.as_ref()
    }

    pub fn set_pending_upload(&mut self, upload: PendingUpload) {
        self.pending_upload = Some(upload);
    }

    pub fn clear_pending_upload(&mut self) {
        self.pending_upload = None;
    }

    /// Discard all conversation state for a fresh start.
    pub fn reset(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.info = CollectedInfo::default();
        self.artifact = None;
        self.pending_upload = None;
    }

    /// Run a full generation: upload a pending attachment (degraded on
    /// failure), open the stream, forward progress, cache the artifact
    /// from the `complete` event.
    pub async fn generate_full(
        &mut self,
        on_progress: impl FnMut(u32, u32, &str),
    ) -> Result<&GeneratedArtifact, GenerateError> {
        self.upload_pending_attachment().await;

        let request = build_generate_request(&self.info, None, None);
        let artifact = self.run_stream(request, on_progress).await?;
        Ok(&*self.artifact.insert(artifact))
    }

    /// Dispatch a regeneration by operation. `image` and `copy` are
    /// one-shot calls that swap a single section of the cached
    /// artifact; `all` streams like a full generation but tags the
    /// request so the backend biases toward the requested change.
    pub async fn regenerate(
        &mut self,
        op: RegenerateOp,
        params: RegenerateParams,
        on_progress: impl FnMut(u32, u32, &str),
    ) -> Result<&GeneratedArtifact, GenerateError> {
        tracing::info!(op = op.as_str(), "regeneration requested");
        match op {
            RegenerateOp::All => {
                // An attachment staged after the previous run uploads
                // here, same as a fresh full generation.
                self.upload_pending_attachment().await;
                let mut request = build_generate_request(
                    &self.info,
                    Some(op.as_str()),
                    params.custom_request.clone(),
                );
                if let Some(ref tone) = params.tone {
                    request.copy_tone = tone.clone();
                }
                let artifact = self.run_stream(request, on_progress).await?;
                Ok(&*self.artifact.insert(artifact))
            }
            RegenerateOp::Image => {
                let cached = self.artifact.as_ref().ok_or(GenerateError::NoArtifact)?;
                let request =
                    build_image_request(cached, &self.info, params.custom_request.as_deref());
                let data = self.api.regenerate_image(&request).await?;
                let fresh: GeneratedArtifact = serde_json::from_value(data)?;
                let next = cached.with_image(fresh.image);
                Ok(&*self.artifact.insert(next))
            }
            RegenerateOp::Copy => {
                let cached = self.artifact.as_ref().ok_or(GenerateError::NoArtifact)?;
                let request = build_copy_request(cached, &self.info, params.tone.as_deref());
                let data = self.api.regenerate_copy(&request).await?;
                let fresh: GeneratedArtifact = serde_json::from_value(data)?;
                let next = cached.with_copy(fresh.copy);
                Ok(&*self.artifact.insert(next))
            }
        }
    }

    /// Upload failure degrades, it never blocks generation. On success
    /// the stored reference lands in `CollectedInfo` so later image or
    /// full regenerations reuse it without re-uploading.
    async fn upload_pending_attachment(&mut self) {
        let Some(upload) = self.pending_upload.take() else {
            return;
        };
        match self.uploader.upload_product_image(&upload).await {
            Ok(path) => {
                tracing::info!(path = %path, "product image uploaded");
                self.info.product_image_path = Some(path);
            }
            Err(e) => {
                tracing::warn!(error = %e, "product image upload failed, continuing without it");
            }
        }
    }

    async fn run_stream(
        &mut self,
        request: GenerateRequest,
        mut on_progress: impl FnMut(u32, u32, &str),
    ) -> Result<GeneratedArtifact, GenerateError> {
        // Supersede: a newer request aborts the previous stream instead
        // of racing it for the cache.
        if let Some(previous) = self.cancel.take() {
            tracing::info!("cancelling superseded generation stream");
            previous.cancel();
        }
        let cancel = CancellationToken::new();
        self.cancel = Some(cancel.clone());

        let result = self.consume_stream(&request, cancel, &mut on_progress).await;
        self.cancel = None;
        result
    }

    async fn consume_stream(
        &self,
        request: &GenerateRequest,
        cancel: CancellationToken,
        on_progress: &mut impl FnMut(u32, u32, &str),
    ) -> Result<GeneratedArtifact, GenerateError> {
        let response = self.api.generate_stream(request).await?;
        let events = stream::events(response, cancel);
        pin_mut!(events);

        let mut artifact = None;
        while let Some(event) = events.next().await {
            match event? {
                StreamEvent::Progress { step, total, message } => {
                    if step >= total {
                        tracing::warn!(step, total, "progress step out of range");
                    }
                    on_progress(step, total, &message);
                }
                StreamEvent::Complete { data, generation_time } => {
                    if let Some(secs) = generation_time {
                        tracing::info!(secs, "generation complete");
                    }
                    artifact = Some(serde_json::from_value(data)?);
                }
                StreamEvent::Error { message } => {
                    return Err(GenerateError::Server(
                        message.unwrap_or_else(|| "콘텐츠 생성 중 오류 발생".into()),
                    ));
                }
            }
        }

        artifact.ok_or(GenerateError::Stream(StreamError::Incomplete))
    }
}

/// Field precedence for payload building: freshly collected value, else
/// cached value, else default.
fn prefer(fresh: Option<&str>, cached: Option<&str>, default: &str) -> String {
    fresh
        .filter(|s| !s.is_empty())
        .or(cached.filter(|s| !s.is_empty()))
        .unwrap_or(default)
        .to_string()
}

/// List variant of [`prefer`]; an empty list counts as absent.
fn prefer_list(fresh: &[String], cached: &[String], default: &[&str]) -> Vec<String> {
    if !fresh.is_empty() {
        fresh.to_vec()
    } else if !cached.is_empty() {
        cached.to_vec()
    } else {
        default.iter().map(|s| s.to_string()).collect()
    }
}

fn build_generate_request(
    info: &CollectedInfo,
    regenerate_type: Option<&str>,
    custom_request: Option<String>,
) -> GenerateRequest {
    GenerateRequest {
        product_name: info.product_name.clone().unwrap_or_default(),
        product_description: info.product_description.clone().unwrap_or_default(),
        category: prefer(info.category.as_deref(), None, DEFAULT_CATEGORY),
        product_image_path: info.product_image_path.clone(),
        target_ages: info.target_ages.clone(),
        target_genders: prefer_list(&info.target_genders, &[], &DEFAULT_GENDERS),
        target_interests: info.target_interests.clone(),
        copy_tone: prefer(info.copy_tone.as_deref(), None, DEFAULT_TONE),
        regenerate_type: regenerate_type.map(str::to_string),
        custom_request,
    }
}

fn build_image_request(
    cached: &GeneratedArtifact,
    info: &CollectedInfo,
    custom_prompt: Option<&str>,
) -> RegenerateImageRequest {
    RegenerateImageRequest {
        product_name: prefer(info.product_name.as_deref(), cached.product_name.as_deref(), ""),
        product_description: prefer(
            info.product_description.as_deref(),
            cached.product_description.as_deref(),
            "",
        ),
        category: prefer(
            info.category.as_deref(),
            cached.category.as_deref(),
            DEFAULT_CATEGORY,
        ),
        target_ages: cached.target_ages.clone(),
        target_genders: cached.target_genders.clone(),
        target_interests: cached.target_interests.clone(),
        selected_strategy: cached.selected_strategy.clone(),
        copy: cached.copy.clone(),
        image: cached.image.clone(),
        product_image_path: info.product_image_path.clone(),
        copy_text: cached.copy.text.clone(),
        image_prompt: cached.image.prompt.clone(),
        custom_prompt: custom_prompt.map(str::to_string),
    }
}

fn build_copy_request(
    cached: &GeneratedArtifact,
    info: &CollectedInfo,
    tone_override: Option<&str>,
) -> RegenerateCopyRequest {
    let copy_tone = match tone_override {
        Some(tone) => tone.to_string(),
        None => prefer(
            info.copy_tone.as_deref(),
            Some(cached.copy.tone.as_str()),
            DEFAULT_TONE,
        ),
    };
    RegenerateCopyRequest {
        product_name: prefer(info.product_name.as_deref(), cached.product_name.as_deref(), ""),
        product_description: prefer(
            info.product_description.as_deref(),
            cached.product_description.as_deref(),
            "",
        ),
        category: prefer(
            info.category.as_deref(),
            cached.category.as_deref(),
            DEFAULT_CATEGORY,
        ),
        target_ages: prefer_list(&info.target_ages, &cached.target_ages, &[]),
        target_genders: prefer_list(&info.target_genders, &cached.target_genders, &DEFAULT_GENDERS),
        target_interests: prefer_list(&info.target_interests, &cached.target_interests, &[]),
        copy_tone,
        strategy_name: cached.selected_strategy.name.clone(),
        core_message: cached.selected_strategy.core_message.clone(),
        selected_strategy: cached.selected_strategy.clone(),
        image: cached.image.clone(),
    }
}
