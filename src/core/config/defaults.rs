use std::time::Duration;

use ratatui::style::Color;

use crate::core::config::data::{ApiProvider, Config};
use crate::core::config::io::ConfigError;
use crate::core::stream::DEFAULT_BUFFER_SIZE;
use crate::ui::render::parse_color;
use crate::utils::url::{construct_api_url, has_http_scheme};

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_MESSAGES: usize = 20;
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant";
pub const API_KEY_ENV: &str = "AICOMPANION_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub provider: Option<ApiProvider>,
    pub model: Option<String>,
}

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub provider: ApiProvider,
    pub model: String,
    pub chat_url: String,
    pub generate_url: String,
    pub models_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub buffer_size: usize,
    pub max_messages: usize,
    pub system_prompt: String,
    pub output: bool,
    pub color: Color,
}

impl Config {
    pub fn resolve(&self, overrides: &SettingsOverrides) -> Result<Settings, ConfigError> {
        self.resolve_with_env(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_with_env(
        &self,
        overrides: &SettingsOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        self.resolve_inner(overrides, env, true)
    }

    /// Like [`Config::resolve`], but a model is optional. Listing models is
    /// how a user finds one to configure.
    pub fn resolve_for_listing(
        &self,
        overrides: &SettingsOverrides,
    ) -> Result<Settings, ConfigError> {
        self.resolve_for_listing_with_env(overrides, |key| std::env::var(key).ok())
    }

    pub fn resolve_for_listing_with_env(
        &self,
        overrides: &SettingsOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Settings, ConfigError> {
        self.resolve_inner(overrides, env, false)
    }

    fn resolve_inner(
        &self,
        overrides: &SettingsOverrides,
        env: impl Fn(&str) -> Option<String>,
        require_model: bool,
    ) -> Result<Settings, ConfigError> {
        let provider = overrides
            .provider
            .or(self.provider)
            .unwrap_or(ApiProvider::Ollama);

        let model = overrides
            .model
            .clone()
            .or_else(|| self.model.clone())
            .filter(|model| !model.trim().is_empty());
        let model = match model {
            Some(model) => model,
            None if require_model => return Err(ConfigError::MissingModel),
            None => String::new(),
        };

        let base_url = self
            .base_url
            .as_deref()
            .unwrap_or_else(|| provider.default_base_url());
        let chat_url = self
            .chat_url
            .clone()
            .unwrap_or_else(|| construct_api_url(base_url, provider.chat_endpoint()));
        let generate_url = self
            .generate_url
            .clone()
            .unwrap_or_else(|| construct_api_url(base_url, provider.generate_endpoint()));
        let models_url = self
            .models_url
            .clone()
            .unwrap_or_else(|| construct_api_url(base_url, provider.models_endpoint()));
        validate_url("chat_url", &chat_url)?;
        validate_url("generate_url", &generate_url)?;
        validate_url("models_url", &models_url)?;

        let api_key = self
            .api_key
            .clone()
            .or_else(|| env(API_KEY_ENV))
            .or_else(|| match provider {
                ApiProvider::OpenAi => env(OPENAI_API_KEY_ENV),
                ApiProvider::Ollama => None,
            })
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() && provider.requires_api_key() {
            return Err(ConfigError::MissingApiKey(provider.to_string()));
        }

        let color = match self.term_color.as_deref() {
            None => Color::Green,
            Some(name) => parse_color(name).unwrap_or(Color::LightMagenta),
        };

        Ok(Settings {
            provider,
            model,
            chat_url,
            generate_url,
            models_url,
            api_key,
            timeout: Duration::from_secs(
                self.http_timeout_secs
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            buffer_size: self
                .buffer_size
                .filter(|size| *size > 0)
                .unwrap_or(DEFAULT_BUFFER_SIZE),
            max_messages: self
                .max_messages
                .filter(|max| *max > 0)
                .unwrap_or(DEFAULT_MAX_MESSAGES),
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            output: self.term_output.unwrap_or(true),
            color,
        })
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if has_http_scheme(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}
