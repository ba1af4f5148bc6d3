//! Vision model backends
//!
//! A backend takes one [`CaptionRequest`] and returns the model's raw text.
//! The pipeline only depends on the [`VisionBackend`] trait, so tests and dry
//! runs swap in [`MockVisionBackend`].

pub mod mock;
pub mod openai;
pub mod retry;

pub use mock::MockVisionBackend;
pub use openai::OpenAiVisionClient;
pub use retry::RetryingBackend;

use crate::models::CaptionRequest;
use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait VisionBackend: Send + Sync {
    /// Perform exactly one round trip and return the raw response text.
    async fn complete(&self, api_key: &str, request: &CaptionRequest) -> Result<String>;
}

#[async_trait]
impl<B: VisionBackend + ?Sized> VisionBackend for Box<B> {
    async fn complete(&self, api_key: &str, request: &CaptionRequest) -> Result<String> {
        (**self).complete(api_key, request).await
    }
}
