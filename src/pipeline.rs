//! Caption pipeline orchestration.
//!
//! normalize → build prompt → one backend call → parse. Precondition errors
//! are raised; upstream and parse failures are recorded and returned as values.

use crate::ai::retry::DEFAULT_MAX_DELAY;
use crate::ai::{MockVisionBackend, OpenAiVisionClient, RetryingBackend, VisionBackend};
use crate::errlog::{FailureSink, FileErrorLog};
use crate::image::ImageNormalizer;
use crate::models::{
    CaptionFailure, CaptionOutcome, CaptionRequest, Config, Detail, FailureCause, ImageInput,
    VocabularyPolicy,
};
use crate::{parser, prompts, Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Injectable collaborators used to construct [`CaptionPipeline`].
pub struct PipelineServices {
    pub backend: Box<dyn VisionBackend>,
    pub sink: Box<dyn FailureSink>,
}

/// Turns a photo plus context into a validated [`crate::models::CaptionResult`].
///
/// Holds no per-call mutable state, so one pipeline can serve many concurrent
/// captions.
pub struct CaptionPipeline {
    backend: Box<dyn VisionBackend>,
    sink: Box<dyn FailureSink>,
    normalizer: ImageNormalizer,
    api_key: Option<String>,
    detail: Detail,
    max_tokens: u32,
    deadline: Duration,
    vocabulary_policy: VocabularyPolicy,
}

impl CaptionPipeline {
    /// Build a pipeline from concrete collaborators, taking settings from `config`.
    pub fn with_services(services: PipelineServices, config: &Config) -> Self {
        Self {
            backend: services.backend,
            sink: services.sink,
            normalizer: ImageNormalizer::new(),
            api_key: config.openai_api_key.clone(),
            detail: config.detail,
            max_tokens: config.max_tokens,
            deadline: call_deadline(config),
            vocabulary_policy: config.vocabulary_policy,
        }
    }

    /// Build the production pipeline: OpenAI backend (or the mock on dry runs),
    /// optional retries and a file error log.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut config = config.clone();

        let backend: Box<dyn VisionBackend> = if config.dry_run {
            info!("DRY_RUN enabled, using the canned vision backend");
            if config.openai_api_key.is_none() {
                config.openai_api_key = Some("dry-run".to_string());
            }
            Box::new(MockVisionBackend::new())
        } else {
            info!("Vision backend: OpenAI (model: {})", config.model);
            Box::new(OpenAiVisionClient::new(config.model.clone(), config.timeout)?)
        };

        let backend: Box<dyn VisionBackend> = if config.max_attempts > 1 {
            info!("Retrying vision calls up to {} times", config.max_attempts);
            Box::new(
                RetryingBackend::new(backend, config.max_attempts)
                    .with_attempt_timeout(config.timeout),
            )
        } else {
            backend
        };

        let sink = Box::new(FileErrorLog::new(&config.error_log_path));

        Ok(Self::with_services(PipelineServices { backend, sink }, &config))
    }

    pub fn with_normalizer(mut self, normalizer: ImageNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Caption one image using the configured credential.
    ///
    /// `context` is free text about the situation, e.g. the current weather.
    pub async fn caption(&self, input: ImageInput, context: &str) -> Result<CaptionOutcome> {
        self.caption_with_key(self.api_key.as_deref(), input, context)
            .await
    }

    /// Caption one image with an explicit credential, overriding the configured one.
    pub async fn caption_with_key(
        &self,
        api_key: Option<&str>,
        input: ImageInput,
        context: &str,
    ) -> Result<CaptionOutcome> {
        let api_key = api_key
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::MissingCredential("OPENAI_API_KEY is not set".to_string()))?;

        let image = self.normalizer.normalize_blocking(input).await?;
        let prompt = prompts::build_caption_prompt(context);
        let request = CaptionRequest::new(image, prompt, self.detail, self.max_tokens);

        let call = self.backend.complete(api_key, &request);
        let raw = match tokio::time::timeout(self.deadline, call).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) if e.is_precondition() => return Err(e),
            Ok(Err(e)) => {
                let failure = CaptionFailure::new(
                    FailureCause::UpstreamError,
                    format!("Vision backend call failed: {}", e),
                    Some(e.to_string()),
                );
                return Ok(Err(self.record(failure)));
            }
            Err(_) => {
                let failure = CaptionFailure::new(
                    FailureCause::UpstreamError,
                    format!("Vision backend timed out after {:?}", self.deadline),
                    None,
                );
                return Ok(Err(self.record(failure)));
            }
        };

        Ok(parser::parse_caption(&raw, self.vocabulary_policy).map_err(|f| self.record(f)))
    }

    fn record(&self, failure: CaptionFailure) -> CaptionFailure {
        warn!("Caption failed ({}): {}", failure.id, failure);
        self.sink.record(&failure);
        failure
    }
}

/// Overall bound on one backend call: every attempt may use the full
/// `timeout`, plus the longest possible backoff sleep between attempts.
fn call_deadline(config: &Config) -> Duration {
    let attempts = u32::try_from(config.max_attempts).unwrap_or(u32::MAX).max(1);
    config
        .timeout
        .saturating_mul(attempts)
        .saturating_add(DEFAULT_MAX_DELAY.saturating_mul(attempts - 1))
}
