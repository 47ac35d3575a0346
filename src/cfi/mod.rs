//! CFI (Canonical Fragment Identifier) module for EPUB
//!
//! This module provides parsing, generation, comparison and resolution of
//! EPUB CFI strings.
//!
//! # Example CFI
//!
//! ```text
//! epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/3:10)
//!         │  │           │ │         │          │ └── character offset 10
//!         │  │           │ │         │          └──── second text run (odd = text)
//!         │  │           │ │         └─────────────── fifth element child, id para05
//!         │  │           │ └───────────────────────── body
//!         │  │           └─────────────────────────── indirection (into content doc)
//!         │  └─────────────────────────────────────── spine item with ID
//!         └────────────────────────────────────────── spine element
//! ```
//!
//! # Usage
//!
//! ```
//! use epub_locator::cfi::{is_before, parse, resolve};
//! use epub_locator::tree::XhtmlDocument;
//!
//! let a = parse("epubcfi(/6/4!/4/2/1:10)").unwrap();
//! let b = parse("epubcfi(/6/4!/4/2/1:20)").unwrap();
//! assert!(is_before(&a, &b));
//!
//! let doc = XhtmlDocument::parse("<html><head/><body><p>Call me Ishmael. Some years ago</p></body></html>").unwrap();
//! let position = resolve(&doc, &a).unwrap();
//! assert_eq!(position.offset, Some(10));
//! ```

mod comparator;
mod error;
mod generator;
mod normalize;
mod parser;
mod resolver;
mod types;

pub use error::CfiError;

// Re-export main types
pub use types::{
    equal_step, AddressPath, AddressRange, AddressStep, CanonicalAddress, StepKind, Terminal,
};

// Re-export parser functions
pub use parser::{is_cfi_string, parse, try_parse};

// Re-export generator
pub use generator::{address_from_node, address_from_range, path_to};

// Re-export resolver
pub use resolver::{resolve, resolve_path, resolve_range, to_xpath, ResolvedPosition, ResolvedRange};

// Re-export comparator functions
pub use comparator::{compare, compare_cfi_strings, is_after, is_before, is_in_range};
