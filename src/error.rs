//! Error types for encode and decode operations.

/// Errors that can occur while encoding or decoding values.
///
/// Every failure is scoped to a single encode or decode call; nothing here
/// is fatal to the process, and no variant is ever silently recovered from.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The tree or wire data did not have the expected shape: wrong
    /// container kind, wrong ASN.1 tag, wrong CBOR major type.
    #[error("structural error: expected {expected}, got {actual}")]
    Structural { expected: String, actual: String },

    /// A keyed container is missing a required key.
    #[error("key not found: {0:?}")]
    KeyNotFound(String),

    /// An unkeyed container was exhausted before the expected element.
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// A key was present but mapped to nil where a value was required.
    #[error("value not found for key {0:?}")]
    ValueNotFound(String),

    /// Malformed byte-level framing: bad length prefix, truncated data,
    /// invalid UTF-8. Carries the byte position where known.
    #[error("corrupted data{}: {message}", .position.map(|p| format!(" at byte {p}")).unwrap_or_default())]
    Corrupted {
        message: String,
        position: Option<usize>,
    },

    /// A polymorphic reference named a type identifier that is not in the
    /// allow-list.
    #[error("unregistered type: {0:?}")]
    UnregisteredType(String),

    /// A value violates the target format's constraints at encode time.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Input nesting exceeded the decoder's depth limit.
    #[error("nesting depth exceeded limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl CodecError {
    /// Structural error from displayable expected/actual descriptors.
    pub fn structural(expected: impl Into<String>, actual: impl std::fmt::Display) -> Self {
        Self::Structural {
            expected: expected.into(),
            actual: actual.to_string(),
        }
    }

    /// Corruption error without a byte position.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
            position: None,
        }
    }

    /// Corruption error at a known byte position.
    pub fn corrupted_at(message: impl Into<String>, position: usize) -> Self {
        Self::Corrupted {
            message: message.into(),
            position: Some(position),
        }
    }
}
