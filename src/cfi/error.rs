//! CFI error types

use thiserror::Error;

/// Errors raised by CFI parsing, construction and resolution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CfiError {
    /// Malformed string, unparseable step or missing spine step.
    /// Never recovered from: it points at a caller bug or corrupt state.
    #[error("Invalid CFI format: {0}")]
    InvalidAddressFormat(String),

    /// A well-formed CFI that no longer resolves against the document
    #[error("CFI not found in document: {0}")]
    AddressNotFound(String),

    /// Inverted or otherwise unusable position pair
    #[error("Cannot build CFI range: {0}")]
    RangeConstruction(String),
}

impl CfiError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        CfiError::InvalidAddressFormat(message.into())
    }

    /// Whether the reference is merely stale and can be dropped or re-anchored
    pub fn is_stale(&self) -> bool {
        matches!(self, CfiError::AddressNotFound(_))
    }
}
