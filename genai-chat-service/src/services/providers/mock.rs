//! Mock provider implementation for testing.

use super::{FinishReason, ProviderError, ProviderResponse, TextProvider};
use async_trait::async_trait;
use std::sync::Mutex;

type FailureFn = Box<dyn Fn() -> ProviderError + Send + Sync>;

enum MockReply {
    Text(String),
    Echo,
    Empty,
    Fail(FailureFn),
}

/// A `generate` call seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub model: String,
    pub prompt: String,
}

/// Mock text provider for testing.
pub struct MockTextProvider {
    reply: MockReply,
    healthy: bool,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTextProvider {
    fn with_reply(reply: MockReply) -> Self {
        Self {
            reply,
            healthy: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(MockReply::Text(text.into()))
    }

    /// Answer with `Mock response for: <prompt>`.
    pub fn echoing() -> Self {
        Self::with_reply(MockReply::Echo)
    }

    /// Succeed without any text, like a candidate with no text parts.
    pub fn without_text() -> Self {
        Self::with_reply(MockReply::Empty)
    }

    /// Fail every call with the error built by `failure`.
    pub fn failing<F>(failure: F) -> Self
    where
        F: Fn() -> ProviderError + Send + Sync + 'static,
    {
        Self::with_reply(MockReply::Fail(Box::new(failure)))
    }

    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<ProviderResponse, ProviderError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedCall {
                model: model.to_string(),
                prompt: prompt.to_string(),
            });

        // Let other requests interleave, as a real network call would
        tokio::task::yield_now().await;

        let text = match &self.reply {
            MockReply::Text(text) => Some(text.clone()),
            MockReply::Echo => Some(format!("Mock response for: {}", prompt)),
            MockReply::Empty => None,
            MockReply::Fail(failure) => return Err(failure()),
        };

        Ok(ProviderResponse {
            output_tokens: text.as_ref().map_or(0, |t| t.len() as i32 / 4),
            text,
            input_tokens: prompt.len() as i32 / 4,
            finish_reason: FinishReason::Complete,
        })
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.healthy {
            Ok(())
        } else {
            Err(ProviderError::NotConfigured(
                "Mock text provider not enabled".to_string(),
            ))
        }
    }
}
