pub mod metrics;
pub mod providers;

pub use providers::gemini::{GeminiClient, GeminiConfig};
pub use providers::{ProviderError, TextProvider};
