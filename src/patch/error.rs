use thiserror::Error;

/// Errors raised while writing through a target path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// The path is syntactically invalid.
    #[error("Malformed target path '{path}': {reason}")]
    MalformedPath { path: String, reason: &'static str },

    /// The path does not name a restorable field.
    #[error("Target path '{path}' does not name a restorable field")]
    UnknownPath { path: String },

    /// The value's shape does not match the field's shape.
    #[error("Field '{path}' expects a {expected} value, got {found}")]
    ValueMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
}
