use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::config::io::ConfigError;
use crate::core::stream::Dialect;

/// Backend family; selects endpoints, auth and stream dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    Ollama,
    OpenAi,
}

impl ApiProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiProvider::Ollama => "ollama",
            ApiProvider::OpenAi => "openai",
        }
    }

    pub fn dialect(self) -> Dialect {
        match self {
            ApiProvider::Ollama => Dialect::NewlineDelimited,
            ApiProvider::OpenAi => Dialect::EventStream,
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            ApiProvider::Ollama => "http://localhost:11434",
            ApiProvider::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn chat_endpoint(self) -> &'static str {
        match self {
            ApiProvider::Ollama => "api/chat",
            ApiProvider::OpenAi => "chat/completions",
        }
    }

    /// OpenAI has no streaming generate endpoint for chat models, so
    /// generate mode reuses chat completions with a two-message prompt.
    pub fn generate_endpoint(self) -> &'static str {
        match self {
            ApiProvider::Ollama => "api/generate",
            ApiProvider::OpenAi => "chat/completions",
        }
    }

    pub fn models_endpoint(self) -> &'static str {
        match self {
            ApiProvider::Ollama => "api/tags",
            ApiProvider::OpenAi => "models",
        }
    }

    pub fn requires_api_key(self) -> bool {
        matches!(self, ApiProvider::OpenAi)
    }
}

impl fmt::Display for ApiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ApiProvider::Ollama),
            "openai" => Ok(ApiProvider::OpenAi),
            other => Err(format!("unknown provider: {other} (expected ollama or openai)")),
        }
    }
}

/// On-disk configuration. Every field is optional; see
/// [`Config::resolve`](super::defaults) for the defaults applied.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    pub provider: Option<ApiProvider>,
    pub model: Option<String>,
    /// Base URL; endpoint paths are appended per provider
    pub base_url: Option<String>,
    /// Full chat URL, overrides `base_url` for chat requests
    pub chat_url: Option<String>,
    /// Full generate URL, overrides `base_url` for generate requests
    pub generate_url: Option<String>,
    /// Full model listing URL, overrides `base_url` for `models`
    pub models_url: Option<String>,
    pub api_key: Option<String>,
    pub http_timeout_secs: Option<u64>,
    /// Read buffer for the response body, in bytes
    pub buffer_size: Option<usize>,
    /// Upper bound on messages sent per request, system prompt included
    pub max_messages: Option<usize>,
    pub system_prompt: Option<String>,
    /// Render replies to the terminal
    pub term_output: Option<bool>,
    /// Reply color, e.g. "green", "light-cyan", "#88c0d0"
    pub term_color: Option<String>,
}

impl Config {
    /// Sets one field from its command-line spelling. Keys are the TOML
    /// field names; dashes may stand in for underscores.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let field = key.trim().replace('-', "_");
        let text = || Some(value.to_string());
        match field.as_str() {
            "provider" => {
                let provider = value
                    .parse::<ApiProvider>()
                    .map_err(|reason| invalid(key, value, reason))?;
                self.provider = Some(provider);
            }
            "model" => self.model = text(),
            "base_url" => self.base_url = text(),
            "chat_url" => self.chat_url = text(),
            "generate_url" => self.generate_url = text(),
            "models_url" => self.models_url = text(),
            "api_key" => self.api_key = text(),
            "system_prompt" => self.system_prompt = text(),
            "term_color" => self.term_color = text(),
            "http_timeout_secs" => self.http_timeout_secs = Some(parse_number(key, value)?),
            "buffer_size" => self.buffer_size = Some(parse_number(key, value)?),
            "max_messages" => self.max_messages = Some(parse_number(key, value)?),
            "term_output" => {
                self.term_output = Some(
                    value
                        .trim()
                        .parse()
                        .map_err(|_| invalid(key, value, "expected true or false".into()))?,
                )
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(key, value, "expected a whole number".into()))
}

fn invalid(key: &str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason,
    }
}

pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
