use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::time::Instant;
use thiserror::Error;

use crate::config::ErrorStatusMode;
use crate::services::metrics;
use crate::services::providers::ProviderError;
use crate::startup::AppState;

/// Body returned to the caller whenever the upstream call fails.
pub const FALLBACK_MESSAGE: &str = "An error occurred while processing your request.";

/// Response header naming the failure kind on fallback responses.
pub const CHAT_ERROR_HEADER: &str = "x-chat-error";

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    pub message: String,
}

/// A failed chat call. Renders as the fallback text.
#[derive(Debug, Error)]
#[error("Error calling Gemini API: {source}")]
pub struct ChatError {
    #[source]
    source: ProviderError,
    status_mode: ErrorStatusMode,
}

impl ChatError {
    fn status(&self) -> StatusCode {
        match (self.status_mode, &self.source) {
            (ErrorStatusMode::Ok, _) => StatusCode::OK,
            (ErrorStatusMode::Strict, ProviderError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            (ErrorStatusMode::Strict, _) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        (
            self.status(),
            [(CHAT_ERROR_HEADER, self.source.kind())],
            FALLBACK_MESSAGE,
        )
            .into_response()
    }
}

/// `GET /gemini/chat?message=...`
///
/// Sends the message verbatim to the configured model and returns the
/// generated text as `text/plain`.
#[tracing::instrument(skip(state, query), fields(message_len = query.message.len()))]
pub async fn gemini_chat(
    State(state): State<AppState>,
    Query(query): Query<ChatQuery>,
) -> Result<String, ChatError> {
    let model = state.config.models.chat_model.as_str();
    let provider = state.text_provider.name();

    let started = Instant::now();
    let result = state.text_provider.generate(model, &query.message).await;
    metrics::record_provider_latency(provider, model, started.elapsed().as_secs_f64());

    match result {
        Ok(response) => {
            metrics::record_tokens(model, response.input_tokens, response.output_tokens);
            metrics::record_chat_request("success");
            Ok(response.text.unwrap_or_default())
        }
        Err(e) => {
            tracing::error!(
                provider = provider,
                error_kind = e.kind(),
                "Error calling Gemini API: {}",
                e
            );
            metrics::record_provider_error(provider, e.kind());
            metrics::record_chat_request(e.kind());
            Err(ChatError {
                source: e,
                status_mode: state.config.chat.error_status,
            })
        }
    }
}
