//! Pre-order tree traversal

use super::{DocumentTree, NodeKind};

/// Iterator over the descendants of a node in document order.
///
/// The starting node itself is not yielded. Calling [`TreeWalker::cancel`]
/// ends the traversal at the next call to `next`.
pub struct TreeWalker<'a, T: DocumentTree + ?Sized> {
    tree: &'a T,
    stack: Vec<T::Node>,
    cancelled: bool,
}

impl<'a, T: DocumentTree + ?Sized> TreeWalker<'a, T> {
    pub fn new(tree: &'a T, start: T::Node) -> Self {
        let stack = tree.children(start).iter().rev().copied().collect();
        Self {
            tree,
            stack,
            cancelled: false,
        }
    }

    /// Stop the walk; remaining nodes are never visited
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.stack.clear();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Restrict the walk to text nodes
    pub fn text_nodes(self) -> impl Iterator<Item = T::Node> + 'a {
        let tree = self.tree;
        self.filter(move |&node| tree.kind(node) == NodeKind::Text)
    }
}

impl<T: DocumentTree + ?Sized> Iterator for TreeWalker<'_, T> {
    type Item = T::Node;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cancelled {
            return None;
        }
        let node = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(node).iter().rev().copied());
        Some(node)
    }
}
