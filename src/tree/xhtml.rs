//! Arena-backed XHTML document
//!
//! Sections are parsed once with `roxmltree` and copied into a flat arena so
//! that nodes are plain `Copy` indices. Comments and processing instructions
//! are dropped and adjacent character data is merged into a single text
//! node, which matches a normalized DOM.

use std::collections::HashMap;

use super::{DocumentTree, NodeKind};

/// Parse XML that may carry a DOCTYPE, as XHTML sections, nav documents,
/// NCX files and package documents usually do
pub(crate) fn parse_xml(source: &str) -> Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(source, options)
}

/// Index of a node in an [`XhtmlDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug)]
enum Payload {
    Element {
        name: String,
        id: Option<String>,
        classes: Vec<String>,
    },
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    payload: Payload,
}

/// A parsed XHTML section
#[derive(Debug)]
pub struct XhtmlDocument {
    nodes: Vec<NodeData>,
    ids: HashMap<String, NodeId>,
    ignore_class: Option<String>,
}

impl XhtmlDocument {
    /// Parse an XHTML (or any XML) document
    pub fn parse(source: &str) -> Result<Self, roxmltree::Error> {
        let doc = parse_xml(source)?;

        let mut document = Self {
            nodes: Vec::new(),
            ids: HashMap::new(),
            ignore_class: None,
        };
        document.copy_element(doc.root_element(), None);
        Ok(document)
    }

    /// Parse a document and treat elements carrying `ignore_class` as ignorable
    pub fn parse_with_ignore_class(
        source: &str,
        ignore_class: Option<&str>,
    ) -> Result<Self, roxmltree::Error> {
        let mut document = Self::parse(source)?;
        document.ignore_class = ignore_class.map(str::to_string);
        Ok(document)
    }

    /// Set or clear the class that marks ignorable elements
    pub fn with_ignore_class(mut self, ignore_class: Option<&str>) -> Self {
        self.ignore_class = ignore_class.map(str::to_string);
        self
    }

    pub fn ignore_class(&self) -> Option<&str> {
        self.ignore_class.as_deref()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether an element carries the given class
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        match &self.nodes[node.0].payload {
            Payload::Element { classes, .. } => classes.iter().any(|c| c == class),
            Payload::Text(_) => false,
        }
    }

    fn push(&mut self, parent: Option<NodeId>, payload: Payload) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            parent,
            children: Vec::new(),
            payload,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        id
    }

    fn copy_element(&mut self, source: roxmltree::Node<'_, '_>, parent: Option<NodeId>) {
        let id = source.attribute("id").map(str::to_string);
        let classes = source
            .attribute("class")
            .map(|value| value.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let node = self.push(
            parent,
            Payload::Element {
                name: source.tag_name().name().to_string(),
                id: id.clone(),
                classes,
            },
        );
        if let Some(id) = id {
            self.ids.entry(id).or_insert(node);
        }

        for child in source.children() {
            if child.is_element() {
                self.copy_element(child, Some(node));
            } else if child.is_text() {
                let Some(text) = child.text() else { continue };
                self.append_text(node, text);
            }
        }
    }

    fn append_text(&mut self, parent: NodeId, text: &str) {
        if let Some(&last) = self.nodes[parent.0].children.last() {
            if let Payload::Text(existing) = &mut self.nodes[last.0].payload {
                existing.push_str(text);
                return;
            }
        }
        self.push(Some(parent), Payload::Text(text.to_string()));
    }
}

impl DocumentTree for XhtmlDocument {
    type Node = NodeId;

    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        match self.nodes[node.0].payload {
            Payload::Element { .. } => NodeKind::Element,
            Payload::Text(_) => NodeKind::Text,
        }
    }

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].payload {
            Payload::Element { name, .. } => Some(name),
            Payload::Text(_) => None,
        }
    }

    fn id(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].payload {
            Payload::Element { id, .. } => id.as_deref(),
            Payload::Text(_) => None,
        }
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        match &self.nodes[node.0].payload {
            Payload::Text(text) => Some(text),
            Payload::Element { .. } => None,
        }
    }

    fn is_ignorable(&self, node: NodeId) -> bool {
        match &self.ignore_class {
            Some(class) => self.has_class(node, class),
            None => false,
        }
    }

    fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }
}
