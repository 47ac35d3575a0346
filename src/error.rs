//! Error types for epub-locator

use thiserror::Error;

use crate::cfi::CfiError;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Cfi(#[from] CfiError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A section could not be loaded or parsed by its loader
    #[error("Section load failed: {0}")]
    SectionLoad(String),

    #[error("Invalid package document: {0}")]
    Package(String),
}

impl Error {
    /// Whether the error is a stale CFI that can be dropped
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::Cfi(e) if e.is_stale())
    }
}
