//! Spine reader
//!
//! Parses the package document (OPF) into an ordered list of [`Section`]s,
//! each carrying the CFI base component that addresses it.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::cfi::{AddressPath, CfiError};
use crate::error::{Error, Result};
use crate::tree::parse_xml;

/// One content document in reading order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    /// 0-based spine position
    pub index: usize,
    pub idref: String,
    /// Manifest href, relative to the package document
    pub href: String,
    /// `false` for `linear="no"` items, which are skipped by location generation
    pub linear: bool,
    /// Chapter component, e.g. `/6/4[chap01ref]`
    pub cfi_base: String,
}

impl Section {
    /// Build a section whose spine element is the `spine_node_index`-th
    /// element child of the package element
    pub fn new(
        index: usize,
        idref: impl Into<String>,
        href: impl Into<String>,
        linear: bool,
        spine_node_index: usize,
    ) -> Self {
        let idref = idref.into();
        let cfi_base = AddressPath::section_base(spine_node_index, index, Some(&idref)).to_string();
        Self {
            index,
            idref,
            href: href.into(),
            linear,
            cfi_base,
        }
    }

    /// The CFI base as a path, ready to prefix generated addresses
    pub fn base(&self) -> std::result::Result<AddressPath, CfiError> {
        AddressPath::parse(&self.cfi_base)
    }
}

/// Ordered sections of a publication
#[derive(Debug, Clone, Default, Serialize)]
pub struct Spine {
    sections: Vec<Section>,
    /// Href of the EPUB 3 navigation document, if declared
    pub nav_href: Option<String>,
    /// Href of the EPUB 2 NCX, if declared
    pub ncx_href: Option<String>,
}

impl Spine {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections,
            nav_href: None,
            ncx_href: None,
        }
    }

    /// Parse a package document
    pub fn parse(opf: &str) -> Result<Self> {
        let doc = parse_xml(opf)?;
        let package = doc.root_element();

        let spine_node = package
            .children()
            .find(|node| node.is_element() && node.tag_name().name() == "spine")
            .ok_or_else(|| Error::Package("no <spine> element".to_string()))?;
        let spine_node_index = package
            .children()
            .filter(|node| node.is_element())
            .position(|node| node == spine_node)
            .unwrap_or(0);

        let mut manifest = HashMap::new();
        let mut nav_href = None;
        for item in doc.descendants().filter(|n| n.tag_name().name() == "item") {
            let (Some(id), Some(href)) = (item.attribute("id"), item.attribute("href")) else {
                continue;
            };
            let is_nav = item
                .attribute("properties")
                .is_some_and(|props| props.split_whitespace().any(|p| p == "nav"));
            if is_nav {
                nav_href = Some(href.to_string());
            }
            manifest.insert(id, href);
        }

        let ncx_href = spine_node
            .attribute("toc")
            .and_then(|toc| manifest.get(toc))
            .map(|href| href.to_string());

        let mut sections = Vec::new();
        // Positions count every itemref so bases match the package document
        for (position, itemref) in spine_node
            .children()
            .filter(|n| n.is_element() && n.tag_name().name() == "itemref")
            .enumerate()
        {
            let Some(idref) = itemref.attribute("idref") else {
                continue;
            };
            let Some(href) = manifest.get(idref) else {
                debug!(idref, "itemref points at no manifest item");
                continue;
            };
            let linear = itemref.attribute("linear").map(|v| v != "no").unwrap_or(true);
            sections.push(Section::new(position, idref, *href, linear, spine_node_index));
        }

        debug!(sections = sections.len(), "parsed spine");

        Ok(Self {
            sections,
            nav_href,
            ncx_href,
        })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Section at spine position `index`
    pub fn get(&self, index: usize) -> Option<&Section> {
        self.sections.iter().find(|section| section.index == index)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Linear sections in reading order
    pub fn linear(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|section| section.linear)
    }

    pub fn by_href(&self, href: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.href == href)
    }
}
