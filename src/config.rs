use serde::Deserialize;
use std::env;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_WEBUI_BASE_URL: &str = "http://localhost:8080";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the summarization service.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root URL of the web application hosting retrieval and model proxies.
    pub webui_base_url: String,
    /// Base URL of the retrieval API (`/query/doc` lives underneath).
    pub retrieval_api_base_url: String,
    /// Base URL of the OpenAI-compatible proxy (`/chat/completions` lives underneath).
    pub openai_api_base_url: String,
    /// Base URL of the Ollama-compatible proxy (`/api/chat` lives underneath).
    pub ollama_api_base_url: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let webui_base_url = load_env_optional("WEBUI_BASE_URL")
            .map(|value| validate_url("WEBUI_BASE_URL", value))
            .transpose()?
            .unwrap_or_else(|| DEFAULT_WEBUI_BASE_URL.to_string());

        let derived = |key: &str, suffix: &str| -> Result<String, ConfigError> {
            match load_env_optional(key) {
                Some(value) => validate_url(key, value),
                None => Ok(format!("{webui_base_url}{suffix}")),
            }
        };

        Ok(Self {
            retrieval_api_base_url: derived("RETRIEVAL_API_BASE_URL", "/api/v1/retrieval")?,
            openai_api_base_url: derived("OPENAI_API_BASE_URL", "/openai")?,
            ollama_api_base_url: derived("OLLAMA_API_BASE_URL", "/ollama")?,
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            webui_base_url,
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Accept only absolute http(s) URLs and strip any trailing slash.
fn validate_url(key: &str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    reqwest::Url::parse(trimmed).map_err(|_| ConfigError::InvalidValue(key.to_string()))?;
    Ok(trimmed.to_string())
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        webui_base_url = %config.webui_base_url,
        retrieval = %config.retrieval_api_base_url,
        openai = %config.openai_api_base_url,
        ollama = %config.ollama_api_base_url,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_url_strips_trailing_slash() {
        let url = validate_url("X", "http://localhost:8080/".into()).expect("valid url");
        assert_eq!(url, "http://localhost:8080");
    }

    #[test]
    fn validate_url_rejects_relative_values() {
        let error = validate_url("OPENAI_API_BASE_URL", "/openai".into()).expect_err("relative");
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "OPENAI_API_BASE_URL"));
    }
}
