use super::client::OpenAiHttpClient;
use super::types::{ChatCompletionRequest, ChatMessage, ChatMessageContent, MessagePart};
use crate::ai::VisionBackend;
use crate::models::CaptionRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// OpenAI implementation of [`VisionBackend`] over chat completions.
pub struct OpenAiVisionClient {
    http: OpenAiHttpClient,
    model: String,
}

impl OpenAiVisionClient {
    pub fn new(model: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: OpenAiHttpClient::new(timeout)?,
            model,
        })
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    fn build_request(&self, request: &CaptionRequest) -> ChatCompletionRequest {
        let user_message = ChatMessage {
            role: "user".to_string(),
            content: Some(ChatMessageContent::Parts(vec![
                MessagePart::text(request.prompt()),
                MessagePart::image_url(request.image().data_uri(), request.detail().as_str()),
            ])),
        };

        ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![user_message],
            max_tokens: request.max_tokens(),
        }
    }
}

#[async_trait]
impl VisionBackend for OpenAiVisionClient {
    async fn complete(&self, api_key: &str, request: &CaptionRequest) -> Result<String> {
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredential(
                "OpenAI API key is empty".to_string(),
            ));
        }

        tracing::debug!(
            "Requesting caption from {} ({} byte {} image, detail {})",
            self.model,
            request.image().bytes.len(),
            request.image().encoding,
            request.detail().as_str()
        );

        let body = self.build_request(request);
        let response = self.http.chat_completion(api_key, &body).await?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| Error::AiProvider("No choices in OpenAI response".to_string()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!("Caption was cut off by the max_tokens budget");
        }

        match &choice.message.content {
            Some(ChatMessageContent::Text(text)) => Ok(text.clone()),
            _ => Err(Error::AiProvider(
                "No text content in OpenAI response".to_string(),
            )),
        }
    }
}
