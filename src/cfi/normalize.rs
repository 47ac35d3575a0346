//! Sibling accounting with ignorable markup folded away.
//!
//! Ignorable elements count as text. A run of adjacent text nodes and
//! ignorable elements occupies a single text position, and element
//! positions skip ignorable elements entirely. Construction and resolution
//! both go through these helpers so the two stay symmetric.

use crate::tree::{DocumentTree, NodeKind, TreeWalker};

/// Normalized position of a child node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    Element(usize),
    Text(usize),
}

fn counts_as_text<T: DocumentTree + ?Sized>(tree: &T, node: T::Node) -> bool {
    tree.kind(node) == NodeKind::Text || tree.is_ignorable(node)
}

/// Slots for every child of `parent`, in child order.
///
/// A text run is numbered by the gap it sits in: the count of element
/// siblings before it. The run ahead of the first element is `Text(0)`
/// and the run after element `k` is `Text(k + 1)`, so on the wire it is
/// the odd number between its neighbouring elements.
pub(crate) fn slots<T: DocumentTree + ?Sized>(tree: &T, parent: T::Node) -> Vec<Slot> {
    let children = tree.children(parent);
    let mut out = Vec::with_capacity(children.len());
    let mut elements = 0;

    for &child in children {
        if counts_as_text(tree, child) {
            out.push(Slot::Text(elements));
        } else {
            out.push(Slot::Element(elements));
            elements += 1;
        }
    }

    out
}

/// Slot of a node among its siblings; `None` for the root
pub(crate) fn slot_of<T: DocumentTree + ?Sized>(tree: &T, node: T::Node) -> Option<Slot> {
    let parent = tree.parent(node)?;
    let position = tree.child_position(node)?;
    slots(tree, parent).get(position).copied()
}

/// Text run index of `piece` and the number of characters that precede it
/// within the run
pub(crate) fn run_position<T: DocumentTree + ?Sized>(
    tree: &T,
    piece: T::Node,
) -> Option<(usize, usize)> {
    let parent = tree.parent(piece)?;
    let position = tree.child_position(piece)?;
    let slots = slots(tree, parent);
    let Slot::Text(run) = slots[position] else {
        return None;
    };

    let children = tree.children(parent);
    let preceding = (0..position)
        .filter(|&i| slots[i] == Slot::Text(run))
        .map(|i| tree.text_len(children[i]))
        .sum();

    Some((run, preceding))
}

/// Children of `parent` making up text run `index`
pub(crate) fn text_run<T: DocumentTree + ?Sized>(
    tree: &T,
    parent: T::Node,
    index: usize,
) -> Vec<T::Node> {
    let children = tree.children(parent);
    slots(tree, parent)
        .into_iter()
        .enumerate()
        .filter(|&(_, slot)| slot == Slot::Text(index))
        .map(|(i, _)| children[i])
        .collect()
}

/// Element child of `parent` at a normalized index
pub(crate) fn element_child<T: DocumentTree + ?Sized>(
    tree: &T,
    parent: T::Node,
    index: usize,
) -> Option<T::Node> {
    let children = tree.children(parent);
    slots(tree, parent)
        .into_iter()
        .position(|slot| slot == Slot::Element(index))
        .map(|i| children[i])
}

/// Outermost ignorable element containing `node` (the node itself included)
pub(crate) fn ignorable_container<T: DocumentTree + ?Sized>(
    tree: &T,
    node: T::Node,
) -> Option<T::Node> {
    let mut outermost = None;
    let mut current = Some(node);
    while let Some(candidate) = current {
        if tree.kind(candidate) == NodeKind::Element && tree.is_ignorable(candidate) {
            outermost = Some(candidate);
        }
        current = tree.parent(candidate);
    }
    outermost
}

/// Characters of text under `container` that precede `target` in document order
pub(crate) fn chars_before<T: DocumentTree + ?Sized>(
    tree: &T,
    container: T::Node,
    target: T::Node,
) -> usize {
    let mut total = 0;
    let mut walker = TreeWalker::new(tree, container);
    while let Some(node) = walker.next() {
        if node == target {
            walker.cancel();
        } else if let Some(text) = tree.text(node) {
            total += text.chars().count();
        }
    }
    total
}

/// Walk the text beneath `ancestor`, consuming `offset` characters.
///
/// Returns the text node and local offset where the count runs out, and
/// whether the offset overflowed and was clamped to the end of the last
/// text node.
pub(crate) fn descend_to_offset<T: DocumentTree + ?Sized>(
    tree: &T,
    ancestor: T::Node,
    offset: usize,
) -> Option<(T::Node, usize, bool)> {
    let mut remaining = offset;
    let mut last = None;

    for node in TreeWalker::new(tree, ancestor).text_nodes() {
        let len = tree.text_len(node);
        if remaining <= len {
            return Some((node, remaining, false));
        }
        remaining -= len;
        last = Some((node, len));
    }

    last.map(|(node, len)| (node, len, true))
}
