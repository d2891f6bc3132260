#![allow(dead_code)]

use axum::{
    body::Body,
    http::Request,
    response::Response,
    Router,
};
use genai_chat_service::config::ChatConfig;
use genai_chat_service::services::providers::mock::MockTextProvider;
use genai_chat_service::startup::{build_router, AppState};
use http_body_util::BodyExt;
use service_core::config::Config;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

/// Config with a dummy credential, bound to a random local port.
pub fn test_config() -> ChatConfig {
    test_config_with(&[])
}

pub fn test_config_with(vars: &[(&str, &str)]) -> ChatConfig {
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("GOOGLE_GENAI_API_KEY".to_string(), "test-api-key".to_string());
    for (key, value) in vars {
        env.insert(key.to_string(), value.to_string());
    }

    let common = Config {
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
    };

    ChatConfig::from_lookup(common, |key| env.get(key).cloned())
        .expect("Failed to build test config")
}

pub fn router_with(config: ChatConfig, provider: Arc<MockTextProvider>) -> Router {
    build_router(AppState::new(config, provider))
}

pub fn router(provider: Arc<MockTextProvider>) -> Router {
    router_with(test_config(), provider)
}

pub fn chat_request(message: &str) -> Request<Body> {
    let query = serde_urlencoded::to_string([("message", message)]).unwrap();
    Request::builder()
        .uri(format!("/gemini/chat?{}", query))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// A log event seen by [`CaptureLayer`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
}

/// Records every event so tests can assert on what was logged.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.level == level)
            .collect()
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
}
