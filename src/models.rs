//! Data models and structures
//!
//! Defines the image input, the per-call caption request, the typed caption
//! result and failure, and the process-wide configuration.

use crate::image::NormalizedImage;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Encodings accepted on the way in and produced on the way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageEncoding {
    Jpeg,
    Png,
}

impl ImageEncoding {
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpeg => "image/jpeg",
            ImageEncoding::Png => "image/png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            ImageEncoding::Jpeg => ImageFormat::Jpeg,
            ImageEncoding::Png => ImageFormat::Png,
        }
    }
}

impl FromStr for ImageEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageEncoding::Jpeg),
            "png" => Ok(ImageEncoding::Png),
            _ => Err(Error::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImageEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageEncoding::Jpeg => write!(f, "JPEG"),
            ImageEncoding::Png => write!(f, "PNG"),
        }
    }
}

/// Where the pixels come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Encoded file bytes (any format the `image` crate can decode).
    Encoded(Vec<u8>),
    /// An already decoded pixel buffer, e.g. a camera frame.
    Pixels(DynamicImage),
}

/// An image handed to the pipeline together with the format it should be
/// re-encoded to. The format tag is validated by the normalizer.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub source: ImageSource,
    pub format: String,
}

impl ImageInput {
    pub fn encoded(bytes: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Encoded(bytes),
            format: format.into(),
        }
    }

    pub fn pixels(image: DynamicImage, format: impl Into<String>) -> Self {
        Self {
            source: ImageSource::Pixels(image),
            format: format.into(),
        }
    }

    /// Read an image file, declaring its format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let format = path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = std::fs::read(path)?;
        Ok(Self::encoded(bytes, format))
    }
}

/// How much visual analysis effort the model spends on the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Detail {
    Low,
    High,
    Auto,
}

impl Detail {
    pub fn as_str(&self) -> &'static str {
        match self {
            Detail::Low => "low",
            Detail::High => "high",
            Detail::Auto => "auto",
        }
    }
}

impl FromStr for Detail {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Detail::Low),
            "high" => Ok(Detail::High),
            "auto" => Ok(Detail::Auto),
            other => Err(Error::Config(format!(
                "Invalid detail '{}'. Expected low, high or auto",
                other
            ))),
        }
    }
}

/// Everything one backend call needs. Built per invocation and consumed by it.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    image: NormalizedImage,
    prompt: String,
    detail: Detail,
    max_tokens: u32,
}

impl CaptionRequest {
    pub fn new(image: NormalizedImage, prompt: String, detail: Detail, max_tokens: u32) -> Self {
        Self {
            image,
            prompt,
            detail,
            max_tokens,
        }
    }

    pub fn image(&self) -> &NormalizedImage {
        &self.image
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn detail(&self) -> Detail {
        self.detail
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// A validated interpretation of the photo. Every genre and tag is drawn from
/// [`crate::vocab`], there is at least one genre and at least three tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionResult {
    pub description: String,
    pub top_music_genres: Vec<String>,
    pub top_tags: Vec<String>,
    pub title_playlist: String,
}

/// Why a caption attempt was recovered into a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    UpstreamError,
    MalformedOutput,
    SchemaViolation,
    VocabularyViolation,
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureCause::UpstreamError => "upstream error",
            FailureCause::MalformedOutput => "malformed output",
            FailureCause::SchemaViolation => "schema violation",
            FailureCause::VocabularyViolation => "vocabulary violation",
        };
        f.write_str(label)
    }
}

/// A recovered caption failure, kept with the raw upstream text.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{cause}: {message}")]
pub struct CaptionFailure {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub cause: FailureCause,
    pub message: String,
    pub raw: Option<String>,
}

impl CaptionFailure {
    pub fn new(cause: FailureCause, message: impl Into<String>, raw: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            cause,
            message: message.into(),
            raw,
        }
    }
}

/// What a caption call yields once preconditions have passed.
pub type CaptionOutcome = std::result::Result<CaptionResult, CaptionFailure>;

/// How out-of-vocabulary genres and tags are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabularyPolicy {
    /// Any unknown entry rejects the whole caption.
    #[default]
    Strict,
    /// Unknown entries are dropped; the caption must still meet its minimum counts.
    Lenient,
}

impl FromStr for VocabularyPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(VocabularyPolicy::Strict),
            "lenient" => Ok(VocabularyPolicy::Lenient),
            other => Err(Error::Config(format!(
                "Invalid vocabulary policy '{}'. Expected strict or lenient",
                other
            ))),
        }
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub model: String,
    pub detail: Detail,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub max_attempts: usize,
    pub vocabulary_policy: VocabularyPolicy,
    pub error_log_path: PathBuf,
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            model: "gpt-4-turbo".to_string(),
            detail: Detail::Low,
            max_tokens: 300,
            timeout: Duration::from_secs(30),
            max_attempts: 1,
            vocabulary_policy: VocabularyPolicy::Strict,
            error_log_path: PathBuf::from("error_log.txt"),
            dry_run: false,
        }
    }
}

impl Config {
    /// Load configuration once at process start (`.env` is honoured).
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let openai_api_key = lookup("OPENAI_API_KEY").filter(|key| !key.trim().is_empty());

        let detail = match lookup("VISION_DETAIL") {
            Some(value) => value.parse()?,
            None => defaults.detail,
        };
        let vocabulary_policy = match lookup("VOCABULARY_POLICY") {
            Some(value) => value.parse()?,
            None => defaults.vocabulary_policy,
        };
        let max_tokens = parse_number(&lookup, "VISION_MAX_TOKENS", defaults.max_tokens)?;
        let timeout_secs =
            parse_number(&lookup, "VISION_TIMEOUT_SECS", defaults.timeout.as_secs())?;
        let max_attempts = parse_number(&lookup, "VISION_MAX_ATTEMPTS", defaults.max_attempts)?;
        if max_attempts == 0 {
            return Err(Error::Config(
                "VISION_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            openai_api_key,
            model: lookup("VISION_MODEL").unwrap_or(defaults.model),
            detail,
            max_tokens,
            timeout: Duration::from_secs(timeout_secs),
            max_attempts,
            vocabulary_policy,
            error_log_path: lookup("ERROR_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.error_log_path),
            dry_run: lookup("DRY_RUN")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}

fn parse_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("{} must be a number, got '{}'", key, value))),
        None => Ok(default),
    }
}
