use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

use crate::services::providers::gemini::{GeminiConfig, GEMINI_API_BASE};

/// Model used for every chat request unless overridden.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.5-flash";

/// Default upstream timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Credential variables, in lookup order. The last two are the ones the
/// Google GenAI SDKs read by default.
const API_KEY_VARS: [&str; 3] = ["GOOGLE_GENAI_API_KEY", "GEMINI_API_KEY", "GOOGLE_API_KEY"];

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub chat: ChatSettings,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model for `/gemini/chat` (e.g., gemini-2.5-flash)
    pub chat_model: String,
}

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub error_status: ErrorStatusMode,
}

/// HTTP status used for the fallback answer of a failed chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorStatusMode {
    /// `200 OK`; the failure kind is only in the `x-chat-error` header.
    #[default]
    Ok,
    /// `502 Bad Gateway`, or `429 Too Many Requests` when upstream rate-limits.
    Strict,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(common_config, |key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(common: core_config::Config, lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let is_prod = lookup("ENVIRONMENT").unwrap_or_else(|| "dev".to_string()) == "prod";
        let get = |key: &str, default: Option<&str>| get_env(&lookup, key, default, is_prod);

        let timeout_secs: u64 = parse_var(
            "GEMINI_TIMEOUT_SECS",
            &get("GEMINI_TIMEOUT_SECS", Some(DEFAULT_TIMEOUT_SECS.to_string().as_str()))?,
        )?;
        if timeout_secs == 0 {
            return Err(config_error("GEMINI_TIMEOUT_SECS must be greater than zero"));
        }

        let chat_model = get("GENAI_CHAT_MODEL", Some(DEFAULT_CHAT_MODEL))?;
        if chat_model.trim().is_empty() {
            return Err(config_error("GENAI_CHAT_MODEL must not be empty"));
        }

        Ok(ChatConfig {
            common,
            google: GoogleConfig {
                api_key: load_api_key(&lookup)?,
                api_base: get("GEMINI_API_BASE", Some(GEMINI_API_BASE))?,
                timeout: Duration::from_secs(timeout_secs),
            },
            models: ModelConfig { chat_model },
            chat: ChatSettings {
                error_status: parse_error_status(&get("CHAT_ERROR_STATUS", Some("ok"))?)?,
            },
        })
    }

    /// Settings for the shared Gemini client.
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.google.api_key.clone(),
            api_base: self.google.api_base.clone(),
            timeout: self.google.timeout,
        }
    }
}

fn config_error(message: &str) -> AppError {
    AppError::ConfigError(anyhow::anyhow!("{}", message))
}

/// First non-blank credential among [`API_KEY_VARS`].
fn load_api_key<F>(lookup: &F) -> Result<Secret<String>, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut blank = None;
    for key in API_KEY_VARS {
        match lookup(key) {
            Some(value) if !value.trim().is_empty() => {
                return Ok(Secret::new(value.trim().to_string()));
            }
            Some(_) => blank = blank.or(Some(key)),
            None => {}
        }
    }

    Err(match blank {
        Some(key) => config_error(&format!("{} is set but empty", key)),
        None => config_error(&format!("{} is required but not set", API_KEY_VARS[0])),
    })
}

fn get_env<F>(lookup: &F, key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => Ok(val),
        None => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("{} is invalid: {}", key, e)))
}

fn parse_error_status(value: &str) -> Result<ErrorStatusMode, AppError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "ok" | "" => Ok(ErrorStatusMode::Ok),
        "strict" => Ok(ErrorStatusMode::Strict),
        other => Err(AppError::ConfigError(anyhow::anyhow!(
            "CHAT_ERROR_STATUS is invalid: expected 'ok' or 'strict', got '{}'",
            other
        ))),
    }
}
