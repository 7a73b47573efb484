use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

/// Boxed error returned by a delta callback.
pub type CallbackError = Box<dyn StdError + Send + Sync>;

/// A frame that could not be turned into a delta.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event-stream frame is missing the `data:` prefix")]
    MissingDataPrefix,

    #[error("backend reported an error: {0}")]
    Backend(String),

    #[error("frame is valid JSON but not a {0} chunk")]
    Unrecognized(&'static str),
}

/// Why a stream ended without a finished message.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("unexpected HTTP status {status}{}", body_suffix(.body))]
    HttpStatus {
        status: StatusCode,
        body: Option<String>,
    },

    #[error("failed to decode stream frame: {source}")]
    Decode {
        #[source]
        source: DecodeError,
    },

    #[error("delta callback failed: {source}")]
    Callback {
        #[source]
        source: CallbackError,
    },

    #[error("stream ended after {frames} frame(s) without a completion signal")]
    Truncated { frames: usize },

    #[error("failed to read response body: {source}")]
    Io {
        #[source]
        source: std::io::Error,
    },
}

fn body_suffix(body: &Option<String>) -> String {
    match body.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(", body: {text}"),
        _ => String::new(),
    }
}

impl StreamError {
    /// Stable classification used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamError::HttpStatus { .. } => "http_status",
            StreamError::Decode { .. } => "decode",
            StreamError::Callback { .. } => "callback",
            StreamError::Truncated { .. } => "truncated_stream",
            StreamError::Io { .. } => "io",
        }
    }
}

impl From<DecodeError> for StreamError {
    fn from(source: DecodeError) -> Self {
        StreamError::Decode { source }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(source: std::io::Error) -> Self {
        StreamError::Io { source }
    }
}

/// Terminal failure of one stream.
///
/// `partial_content` is whatever text was accumulated before the failure. It
/// is never a finished reply; callers that show it must mark it incomplete.
#[derive(Debug)]
pub struct StreamFailure {
    pub error: StreamError,
    pub partial_content: String,
    pub last_frame: Option<String>,
}

impl StreamFailure {
    pub fn new(error: StreamError) -> Self {
        Self {
            error,
            partial_content: String::new(),
            last_frame: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.error.kind()
    }
}

impl fmt::Display for StreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl StdError for StreamFailure {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.error)
    }
}

impl From<StreamError> for StreamFailure {
    fn from(error: StreamError) -> Self {
        Self::new(error)
    }
}
