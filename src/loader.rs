//! Section loading
//!
//! Location generation pulls section documents through a [`SectionLoader`]
//! one at a time and releases each as soon as its chunks are extracted.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::spine::{Section, Spine};
use crate::tree::{parse_xml, DocumentTree, XhtmlDocument};

/// Source of section document trees
#[async_trait]
pub trait SectionLoader: Send + Sync {
    type Document: DocumentTree + Send;

    /// Load and parse a section
    async fn load(&self, section: &Section) -> Result<Self::Document>;

    /// Release whatever the loader keeps for a section
    async fn unload(&self, _section: &Section) {}
}

/// Loader over section sources held in memory, keyed by href
#[derive(Debug, Default)]
pub struct MemoryLoader {
    sources: HashMap<String, String>,
    ignore_class: Option<String>,
    resident: Mutex<HashSet<usize>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_class(mut self, ignore_class: Option<&str>) -> Self {
        self.ignore_class = ignore_class.map(str::to_string);
        self
    }

    pub fn insert(&mut self, href: impl Into<String>, source: impl Into<String>) {
        self.sources.insert(href.into(), source.into());
    }

    /// Sections loaded and not yet unloaded
    pub fn resident(&self) -> usize {
        self.resident.lock().len()
    }
}

#[async_trait]
impl SectionLoader for MemoryLoader {
    type Document = XhtmlDocument;

    async fn load(&self, section: &Section) -> Result<XhtmlDocument> {
        let source = self
            .sources
            .get(&section.href)
            .ok_or_else(|| Error::SectionLoad(format!("no source for {}", section.href)))?;
        let doc = XhtmlDocument::parse_with_ignore_class(source, self.ignore_class.as_deref())?;
        self.resident.lock().insert(section.index);
        Ok(doc)
    }

    async fn unload(&self, section: &Section) {
        self.resident.lock().remove(&section.index);
    }
}

/// Loader over an unpacked publication on disk
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    /// Directory the section hrefs are relative to (the package directory)
    root: PathBuf,
    ignore_class: Option<String>,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore_class: None,
        }
    }

    pub fn with_ignore_class(mut self, ignore_class: Option<&str>) -> Self {
        self.ignore_class = ignore_class.map(str::to_string);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Open an unpacked publication: follow `META-INF/container.xml` to the
    /// package document, parse its spine, and root the loader at the
    /// package directory
    pub async fn open(publication: impl AsRef<Path>) -> Result<(Self, Spine)> {
        let publication = publication.as_ref();
        let container = tokio::fs::read_to_string(publication.join("META-INF/container.xml")).await?;
        let opf_path = rootfile_path(&container)?;

        let opf_file = publication.join(&opf_path);
        let opf = tokio::fs::read_to_string(&opf_file).await?;
        let spine = Spine::parse(&opf)?;

        let root = opf_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| publication.to_path_buf());
        debug!(opf = %opf_file.display(), sections = spine.len(), "opened publication");

        Ok((Self::new(root), spine))
    }

    /// Read a file relative to the package directory
    pub async fn read(&self, href: &str) -> Result<String> {
        let path = self.resolve_href(href);
        Ok(tokio::fs::read_to_string(path).await?)
    }

    fn resolve_href(&self, href: &str) -> PathBuf {
        let without_fragment = href.split('#').next().unwrap_or(href);
        let decoded = urlencoding::decode(without_fragment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| without_fragment.to_string());
        self.root.join(decoded)
    }
}

#[async_trait]
impl SectionLoader for DirectoryLoader {
    type Document = XhtmlDocument;

    async fn load(&self, section: &Section) -> Result<XhtmlDocument> {
        let source = self
            .read(&section.href)
            .await
            .map_err(|e| Error::SectionLoad(format!("{}: {}", section.href, e)))?;
        Ok(XhtmlDocument::parse_with_ignore_class(
            &source,
            self.ignore_class.as_deref(),
        )?)
    }
}

/// Package document path declared by `container.xml`
fn rootfile_path(container: &str) -> Result<String> {
    let doc = parse_xml(container)?;
    doc.descendants()
        .find(|node| node.tag_name().name() == "rootfile")
        .and_then(|node| node.attribute("full-path"))
        .map(str::to_string)
        .ok_or_else(|| Error::Package("container.xml declares no rootfile".to_string()))
}
