//! Error types for connections and request builders.
//!
//! # Design
//! Each variant corresponds to the stage that failed: building the
//! connection, fixing the verb, misusing the builder API, the exchange
//! itself, or encoding the body. Nothing is retried or swallowed; every
//! failure reaches the caller of the operation that produced it.

use thiserror::Error;

/// Boxed error used by pluggable collaborators (transports, serializers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum HttpError {
    /// The URL is malformed, or the transport could not be opened.
    #[error("cannot open connection to `{url}`: {reason}")]
    Construction { url: String, reason: String },

    /// The verb could not be fixed on the transport.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The API was called out of order, e.g. after `close()`.
    #[error("usage error: {0}")]
    Usage(String),

    /// The exchange failed while executing the request.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The request body could not be produced by the serializer.
    #[error("serialization failed: {0}")]
    Serialization(#[source] BoxError),

    /// The response body could not be decoded into the requested type.
    #[cfg(feature = "json")]
    #[error("deserialization failed: {0}")]
    Deserialization(#[from] serde_json::Error),
}

impl HttpError {
    pub(crate) fn usage(msg: impl Into<String>) -> Self {
        HttpError::Usage(msg.into())
    }

    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        HttpError::Protocol(msg.into())
    }

    pub(crate) fn construction(url: &str, reason: impl ToString) -> Self {
        HttpError::Construction {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, HttpError::Usage(_))
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, HttpError::Protocol(_))
    }
}

impl From<ureq::Error> for HttpError {
    fn from(e: ureq::Error) -> Self {
        HttpError::Transport(Box::new(e))
    }
}
