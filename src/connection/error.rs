use thiserror::Error;

use crate::protocol::ProtocolError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,

    #[error("Transport is already open")]
    AlreadyOpen,

    #[error("Failed to open {url}: {reason}")]
    Open { url: String, reason: String },

    #[error("Send failed: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Cannot derive manifest location from '{url}': {reason}")]
    Url { url: String, reason: &'static str },

    #[error("Manifest request failed: {0}")]
    Fetch(String),

    #[error("Manifest request returned HTTP {0}")]
    Status(u16),

    #[error("Manifest is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid app URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Session startup needs a running tokio runtime")]
    NoRuntime,

    #[error("Session is stopped")]
    Stopped,

    #[error("Session is not in the execution phase")]
    NotRunning,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
