//! epub-locator
//!
//! Canonical location addressing for reflowable EPUB publications:
//!
//! - [`cfi`]: parse, serialize, compare, generate and resolve EPUB CFIs
//! - [`locations`]: fixed-size location index with percentage navigation
//! - [`pagelist`]: publisher print page list mapped onto CFIs
//!
//! The crate renders nothing. Section documents are reached through the
//! [`tree::DocumentTree`] trait and loaded through a
//! [`loader::SectionLoader`].

pub mod cfi;
pub mod config;
pub mod error;
pub mod loader;
pub mod locations;
pub mod pagelist;
pub mod spine;
pub mod tree;

pub use cfi::{CanonicalAddress, CfiError};
pub use config::Config;
pub use error::{Error, Result};
pub use locations::Locations;
pub use pagelist::PageList;
pub use spine::{Section, Spine};
