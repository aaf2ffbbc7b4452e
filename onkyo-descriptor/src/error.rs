//! Error types for descriptor parsing

use thiserror::Error;

/// Errors that can occur while building a capability model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    /// The text is not well-formed XML or does not match the descriptor schema
    #[error("Malformed descriptor: {0}")]
    MalformedDescriptor(String),

    /// A required element is absent
    #[error("Missing required element: {0}")]
    MissingElement(&'static str),

    /// The frame payload holds no XML document
    #[error("No XML document in payload")]
    NoDocument,
}

/// Result type alias for descriptor operations
pub type Result<T> = std::result::Result<T, DescriptorError>;
