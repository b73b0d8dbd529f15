use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No payload type is registered for this tag.
    #[error("Unregistered payload type '{tag}'")]
    UnregisteredPayload { tag: String },

    #[error("Payload has no 'type' discriminator")]
    MissingType,

    #[error("Payload '{tag}' must serialize to a JSON object")]
    NotAnObject { tag: String },

    #[error("Malformed '{tag}' payload: {source}")]
    MalformedPayload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid message JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a text frame, got {len} binary bytes")]
    BinaryFrame { len: usize },
}
