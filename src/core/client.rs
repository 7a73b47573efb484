//! HTTP transport: builds the provider request, hands the response to the
//! stream orchestrator and records finished turns.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use tracing::debug;

use crate::api::models::sort_models;
use crate::api::{ChatRequest, GenerateRequest, ModelInfo, ModelsResponse, OllamaTagsResponse};
use crate::core::config::{ApiProvider, Settings};
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::stream::{DeltaCallback, StreamFailure, StreamOrchestrator};
use crate::ui::spinner::WaitingIndicator;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Unexpected response from {url}: {source}")]
    Response {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Stream(#[from] StreamFailure),
}

impl ClientError {
    /// Text received before a stream failed, if any.
    pub fn partial_content(&self) -> Option<&str> {
        match self {
            ClientError::Stream(failure) if !failure.partial_content.is_empty() => {
                Some(&failure.partial_content)
            }
            _ => None,
        }
    }
}

/// One chat session against a single provider.
pub struct CompanionClient {
    settings: Settings,
    http: reqwest::Client,
    conversation: Conversation,
    orchestrator: StreamOrchestrator,
}

impl CompanionClient {
    pub fn new(settings: Settings) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(ClientError::Build)?;
        let conversation = Conversation::new(settings.system_prompt.clone(), settings.max_messages);
        let orchestrator = StreamOrchestrator::new(settings.provider.dialect())
            .with_buffer_size(settings.buffer_size);

        Ok(Self {
            settings,
            http,
            conversation,
            orchestrator,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn conversation_mut(&mut self) -> &mut Conversation {
        &mut self.conversation
    }

    /// Sends `user` with the trimmed history and streams the reply.
    ///
    /// The exchange is added to the history only when the stream completes.
    pub async fn send_chat(
        &mut self,
        user: Message,
        callback: Option<DeltaCallback<'_>>,
    ) -> Result<Message, ClientError> {
        let messages = self.conversation.prepare(&user);
        let request = ChatRequest {
            model: &self.settings.model,
            messages: &messages,
            stream: true,
        };

        debug!(
            provider = self.settings.provider.as_str(),
            dialect = self.orchestrator.dialect().as_str(),
            messages = messages.len(),
            "sending chat request"
        );
        let response = self.post(&self.settings.chat_url, &request).await?;
        let reply = self.orchestrator.run_response(response, callback).await?;

        self.conversation.record_turn(user, reply.clone());
        Ok(reply)
    }

    /// Single-prompt completion. History is neither sent nor updated.
    pub async fn send_generate(
        &self,
        prompt: &str,
        images: &[String],
        callback: Option<DeltaCallback<'_>>,
    ) -> Result<Message, ClientError> {
        let url = &self.settings.generate_url;
        debug!(
            provider = self.settings.provider.as_str(),
            images = images.len(),
            "sending generate request"
        );

        let response = match self.settings.provider {
            ApiProvider::Ollama => {
                let request = GenerateRequest {
                    model: &self.settings.model,
                    prompt,
                    system: Some(&self.settings.system_prompt),
                    images: (!images.is_empty()).then_some(images),
                    stream: true,
                };
                self.post(url, &request).await?
            }
            ApiProvider::OpenAi => {
                let messages = [
                    self.conversation.system().clone(),
                    Message::user(prompt),
                ];
                let request = ChatRequest {
                    model: &self.settings.model,
                    messages: &messages,
                    stream: true,
                };
                self.post(url, &request).await?
            }
        };

        Ok(self.orchestrator.run_response(response, callback).await?)
    }

    /// Lists the models the backend can serve, newest first.
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, ClientError> {
        let url = &self.settings.models_url;
        let request_err = |source| ClientError::Request {
            url: url.to_string(),
            source,
        };
        let response_err = |source| ClientError::Response {
            url: url.to_string(),
            source,
        };

        let mut request = self.http.get(url);
        if let Some(api_key) = &self.settings.api_key {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await.map_err(request_err)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                body,
            });
        }

        let mut models = match self.settings.provider {
            ApiProvider::Ollama => {
                let tags = response
                    .json::<OllamaTagsResponse>()
                    .await
                    .map_err(response_err)?;
                ModelsResponse::from(tags).data
            }
            ApiProvider::OpenAi => {
                response
                    .json::<ModelsResponse>()
                    .await
                    .map_err(response_err)?
                    .data
            }
        };
        sort_models(&mut models);
        debug!(
            provider = self.settings.provider.as_str(),
            count = models.len(),
            "listed models"
        );
        Ok(models)
    }

    /// Posts `body` and returns once response headers arrive. The waiting
    /// indicator runs only while the request is in flight.
    async fn post<T: Serialize>(
        &self,
        url: &str,
        body: &T,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self.http.post(url).json(body);
        if let Some(api_key) = &self.settings.api_key {
            request = request.bearer_auth(api_key);
        }

        let indicator = WaitingIndicator::start(self.settings.output);
        let result = request.send().await;
        indicator.stop().await;

        result.map_err(|source| ClientError::Request {
            url: url.to_string(),
            source,
        })
    }
}

/// Reads an image from disk as base64 for inline attachment.
pub fn read_image(path: &Path) -> Result<String, ClientError> {
    let bytes = std::fs::read(path).map_err(|source| ClientError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}
