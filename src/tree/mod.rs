//! Document tree abstraction
//!
//! The CFI engine never touches a concrete DOM. It walks any tree that
//! implements [`DocumentTree`]: child enumeration, parent lookup, id lookup,
//! text access and "ignorable" classification of injected markup.
//!
//! [`XhtmlDocument`] is the bundled implementation, an arena built from an
//! XHTML section with `roxmltree`.

mod walker;
mod xhtml;

use std::fmt;

pub use walker::TreeWalker;
pub use xhtml::{NodeId, XhtmlDocument};
pub(crate) use xhtml::parse_xml;

/// Kind of a tree node as seen by the addressing scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
}

/// A node plus an optional character offset into it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePosition<N> {
    pub node: N,
    pub offset: Option<usize>,
}

impl<N> TreePosition<N> {
    /// Position at a node without an offset
    pub fn node(node: N) -> Self {
        Self { node, offset: None }
    }

    /// Position at a character offset inside a node
    pub fn at(node: N, offset: usize) -> Self {
        Self {
            node,
            offset: Some(offset),
        }
    }
}

/// Read access to a section's document tree.
///
/// `root` is the root container (the document element); it is never itself
/// addressed by a step. Implementations must be deterministic for a given
/// snapshot of the section.
pub trait DocumentTree {
    type Node: Copy + Eq + fmt::Debug;

    /// The document element
    fn root(&self) -> Self::Node;

    /// Parent of a node, `None` for the root
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;

    /// All child nodes (elements and text) in document order
    fn children(&self, node: Self::Node) -> &[Self::Node];

    fn kind(&self, node: Self::Node) -> NodeKind;

    /// Local tag name of an element
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    /// `id` attribute of an element
    fn id(&self, node: Self::Node) -> Option<&str>;

    /// Character data of a text node
    fn text(&self, node: Self::Node) -> Option<&str>;

    /// Whether an element is injected markup that must not affect addressing
    fn is_ignorable(&self, node: Self::Node) -> bool;

    /// Document-wide lookup of an element by id
    fn element_by_id(&self, id: &str) -> Option<Self::Node> {
        let root = self.root();
        if self.id(root) == Some(id) {
            return Some(root);
        }
        TreeWalker::new(self, root)
            .find(|&node| self.kind(node) == NodeKind::Element && self.id(node) == Some(id))
    }

    /// Concatenated text of a node and its descendants
    fn text_content(&self, node: Self::Node) -> String {
        if let Some(text) = self.text(node) {
            return text.to_string();
        }
        TreeWalker::new(self, node)
            .text_nodes()
            .filter_map(|text| self.text(text))
            .collect()
    }

    /// Length in characters of [`DocumentTree::text_content`]
    fn text_len(&self, node: Self::Node) -> usize {
        if let Some(text) = self.text(node) {
            return text.chars().count();
        }
        TreeWalker::new(self, node)
            .text_nodes()
            .filter_map(|text| self.text(text))
            .map(|text| text.chars().count())
            .sum()
    }

    /// The `<body>` element, or the root when there is none
    fn body(&self) -> Self::Node {
        let root = self.root();
        self.children(root)
            .iter()
            .copied()
            .find(|&child| self.tag_name(child) == Some("body"))
            .unwrap_or(root)
    }

    /// Position of a node within its parent's child list
    fn child_position(&self, node: Self::Node) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&child| child == node)
    }

    fn previous_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let position = self.child_position(node)?;
        position
            .checked_sub(1)
            .map(|prev| self.children(parent)[prev])
    }

    fn next_sibling(&self, node: Self::Node) -> Option<Self::Node> {
        let parent = self.parent(node)?;
        let position = self.child_position(node)?;
        self.children(parent).get(position + 1).copied()
    }

    /// Whether `node` is `ancestor` or lies beneath it
    fn is_within(&self, node: Self::Node, ancestor: Self::Node) -> bool {
        let mut current = Some(node);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }
}
