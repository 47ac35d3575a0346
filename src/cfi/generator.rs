//! CFI Generator
//!
//! Generates CFIs from positions in a section's document tree and from
//! pairs of positions (text selections).

use std::cmp::Ordering;

use super::comparator::compare;
use super::error::CfiError;
use super::normalize::{chars_before, ignorable_container, run_position, slot_of, Slot};
use super::types::*;
use crate::tree::{DocumentTree, NodeKind, TreePosition};

/// Generate a CFI for a node, optionally at a character offset.
///
/// `base` is the section's chapter component (see [`AddressPath::section_base`]).
/// Element ids along the way are recorded as step assertions, and
/// ignorable markup is folded away so the result matches the unannotated
/// document.
pub fn address_from_node<T: DocumentTree + ?Sized>(
    tree: &T,
    node: T::Node,
    offset: Option<usize>,
    base: &AddressPath,
) -> Result<CanonicalAddress, CfiError> {
    let path = path_to(tree, node, offset)?;
    CanonicalAddress::new(base.clone(), path)
}

/// Generate a range CFI for a text selection.
///
/// The shared leading steps become the range prefix. The last step of the
/// start path is never absorbed, so both suffixes always carry at least
/// one step. Identical positions produce a point CFI, and an end that
/// precedes the start is rejected.
pub fn address_from_range<T: DocumentTree + ?Sized>(
    tree: &T,
    start: TreePosition<T::Node>,
    end: TreePosition<T::Node>,
    base: &AddressPath,
) -> Result<CanonicalAddress, CfiError> {
    let start_path = path_to(tree, start.node, start.offset)?;
    let end_path = path_to(tree, end.node, end.offset)?;

    if start_path == end_path {
        return CanonicalAddress::new(base.clone(), start_path);
    }

    let start_point = CanonicalAddress::new(base.clone(), start_path.clone())?;
    let end_point = CanonicalAddress::new(base.clone(), end_path.clone())?;
    if compare(&start_point, &end_point) == Ordering::Greater {
        return Err(CfiError::RangeConstruction(format!(
            "end {} precedes start {}",
            end_point, start_point
        )));
    }

    let limit = start_path
        .steps
        .len()
        .min(end_path.steps.len())
        .saturating_sub(1);
    let shared = start_path
        .steps
        .iter()
        .zip(&end_path.steps)
        .take(limit)
        .take_while(|(a, b)| equal_step(a, b))
        .count();

    let prefix = AddressPath::with_steps(start_path.steps[..shared].to_vec());
    let start_suffix = AddressPath {
        steps: start_path.steps[shared..].to_vec(),
        terminal: start_path.terminal,
    };
    let end_suffix = AddressPath {
        steps: end_path.steps[shared..].to_vec(),
        terminal: end_path.terminal,
    };

    CanonicalAddress::with_range(base.clone(), prefix, start_suffix, end_suffix)
}

/// Steps from the root container down to `node`.
///
/// Text nodes and anything inside ignorable markup are re-anchored onto
/// their normalized text run, with the offset folded into a run offset.
/// When an offset is given but the path ends on an element, a step into
/// that element's first text run is appended.
pub fn path_to<T: DocumentTree + ?Sized>(
    tree: &T,
    node: T::Node,
    offset: Option<usize>,
) -> Result<AddressPath, CfiError> {
    let mut steps = Vec::new();
    let mut terminal_offset = offset;
    let mut current = node;

    let anchor = match ignorable_container(tree, node) {
        Some(container) => {
            let local = if tree.kind(node) == NodeKind::Text {
                offset.unwrap_or(0)
            } else {
                0
            };
            Some((container, chars_before(tree, container, node) + local))
        }
        None if tree.kind(node) == NodeKind::Text => Some((node, offset.unwrap_or(0))),
        None => None,
    };

    if let Some((piece, within)) = anchor {
        let (run, preceding) = run_position(tree, piece)
            .ok_or_else(|| CfiError::format("text position has no parent element"))?;
        let folded = preceding + within;
        steps.push(AddressStep::text(run));
        if offset.is_some() || folded > 0 {
            terminal_offset = Some(folded);
        }
        // run_position only succeeds for nodes that have a parent
        current = tree.parent(piece).unwrap_or(current);
    }

    while tree.parent(current).is_some() {
        let Some(Slot::Element(index)) = slot_of(tree, current) else {
            return Err(CfiError::format("element step resolved to a text run"));
        };
        steps.push(AddressStep {
            kind: StepKind::Element,
            index,
            id: tree.id(current).map(str::to_string),
        });
        // loop condition guarantees a parent
        current = tree.parent(current).unwrap_or(current);
    }

    steps.reverse();

    if terminal_offset.is_some() && !steps.last().is_some_and(AddressStep::is_text) {
        steps.push(AddressStep::text(0));
    }

    if steps.is_empty() {
        return Err(CfiError::format("the root container cannot be addressed"));
    }

    Ok(AddressPath {
        steps,
        terminal: Terminal {
            offset: terminal_offset,
            assertion: None,
        },
    })
}
