use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

pub type Result<T, E = EnvokeError> = std::result::Result<T, E>;

/// Coarse classification of an [`EnvokeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ConfigurationMissing,
    RemoteCallFailed,
    NetworkOrTimeout,
    Serialization,
    InvalidHeader,
}

/// Failure of an outbound call.
///
/// Cloneable so the same error can be stored on a
/// [`DispatchResult`](crate::DispatchResult) and returned to the caller.
#[derive(Debug, Clone, Error)]
pub enum EnvokeError {
    #[error("required configuration `{key}` is missing")]
    ConfigurationMissing { key: String },

    #[error("{message}")]
    RemoteCallFailed {
        message: String,
        status: reqwest::StatusCode,
    },

    #[error("{message}")]
    Transport {
        message: String,
        timed_out: bool,
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("encoding arguments: {0}")]
    Encode(#[source] Arc<serde_json::Error>),

    #[error("decoding response: {0}")]
    Decode(#[source] Arc<serde_json::Error>),

    #[error("invalid header `{0}`")]
    InvalidHeader(String),
}

impl EnvokeError {
    pub(crate) fn remote(message: String, status: reqwest::StatusCode) -> Self {
        Self::RemoteCallFailed { message, status }
    }

    pub(crate) fn transport(source: reqwest::Error) -> Self {
        let timed_out = source.is_timeout();
        let message = if timed_out {
            "request timed out".to_owned()
        } else {
            source.to_string()
        };
        Self::Transport {
            message,
            timed_out,
            source: Arc::new(source),
        }
    }

    pub(crate) fn encode(source: serde_json::Error) -> Self {
        Self::Encode(Arc::new(source))
    }

    pub(crate) fn decode(source: serde_json::Error) -> Self {
        Self::Decode(Arc::new(source))
    }

    pub fn kind(&self) -> ErrorKind {
        use EnvokeError::*;
        match self {
            ConfigurationMissing { .. } => ErrorKind::ConfigurationMissing,
            RemoteCallFailed { .. } => ErrorKind::RemoteCallFailed,
            Transport { .. } => ErrorKind::NetworkOrTimeout,
            Encode(_) | Decode(_) => ErrorKind::Serialization,
            InvalidHeader(_) => ErrorKind::InvalidHeader,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    /// HTTP status of the remote response, if one was received.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::RemoteCallFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether `raise_on_error = false` may turn this error into a reported result.
    pub(crate) fn is_reportable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RemoteCallFailed | ErrorKind::NetworkOrTimeout
        )
    }
}

/// Rejection of an inbound request body. Always rendered as a 400 response.
#[derive(Debug, Error)]
pub enum BindError {
    #[error("{0}")]
    Malformed(#[from] serde_json::Error),

    #[error("reading request body: {0}")]
    BodyRead(String),

    #[error("parameter `{name}`: {source}")]
    Parameter {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IntoResponse for BindError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": "Invalid JSON format",
            "details": self.to_string(),
        });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}
