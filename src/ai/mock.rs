use super::VisionBackend;
use crate::models::CaptionRequest;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Reply used when no canned responses were configured.
pub const DEFAULT_CAPTION: &str = r#"{"description": "The person is wearing a black hoodie with a white band print and gives off a relaxed, confident vibe.", "top_music_genres": ["rock", "hip hop"], "top_tags": ["night/time", "feelings", "shake the audience"], "title_playlist": "After Hours"}"#;

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Stalled(String, Duration),
    Failure(String),
}

/// Deterministic backend for tests and dry runs. Clones share state.
#[derive(Clone)]
pub struct MockVisionBackend {
    replies: Arc<Mutex<Vec<MockReply>>>,
    requests: Arc<Mutex<Vec<CaptionRequest>>>,
    call_count: Arc<Mutex<usize>>,
    delay: Option<Duration>,
}

impl MockVisionBackend {
    pub fn new() -> Self {
        Self {
            replies: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            call_count: Arc::new(Mutex::new(0)),
            delay: None,
        }
    }

    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Text(response.into()));
        self
    }

    /// Queue a reply that only arrives after `delay`, on top of any global delay.
    pub fn with_stalled_response(self, response: impl Into<String>, delay: Duration) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Stalled(response.into(), delay));
        self
    }

    /// Queue an upstream failure, surfaced as [`Error::AiProvider`].
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push(MockReply::Failure(message.into()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// Requests seen so far, oldest first.
    pub fn requests(&self) -> Vec<CaptionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockVisionBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VisionBackend for MockVisionBackend {
    async fn complete(&self, _api_key: &str, request: &CaptionRequest) -> Result<String> {
        let reply = {
            let mut count = self.call_count.lock().unwrap();
            *count += 1;
            self.requests.lock().unwrap().push(request.clone());

            let replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                MockReply::Text(DEFAULT_CAPTION.to_string())
            } else {
                let index = (*count - 1) % replies.len();
                replies[index].clone()
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Stalled(text, delay) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            MockReply::Failure(message) => Err(Error::AiProvider(message)),
        }
    }
}
