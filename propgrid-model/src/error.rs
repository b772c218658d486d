//! Error types for the metadata layer.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the metadata registration boundary.
///
/// The grid's synchronization path deliberately absorbs recoverable
/// conditions (a property with no editor is omitted, an unknown category
/// name is a no-op); these errors only surface programming misuse when
/// classes and properties are being registered.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown class: {0}")]
    UnknownClass(String),

    #[error("unknown property: {class}.{name}")]
    UnknownProperty { class: String, name: String },

    #[error("class already registered: {0}")]
    DuplicateClass(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
