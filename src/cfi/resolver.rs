//! CFI Resolution
//!
//! Maps a parsed CFI back onto a live document tree. Steps are matched by
//! id first and by normalized child index otherwise, so ids survive markup
//! being inserted before an element and indexes cover elements without ids.
//!
//! A CFI that no longer matches the document exactly is repaired instead of
//! failing: resolution falls back to the deepest ancestor that still
//! resolves and spreads the terminal offset over its text. Positions found
//! this way carry `approximate: true`.

use tracing::debug;

use super::error::CfiError;
use super::normalize::{descend_to_offset, element_child, text_run};
use super::types::*;
use crate::tree::{DocumentTree, NodeKind};

/// A concrete position in a document tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPosition<N> {
    pub node: N,
    /// Character offset within `node` (a text node unless the CFI named an
    /// element without an offset)
    pub offset: Option<usize>,
    /// Set when the CFI did not match exactly and the position was repaired
    pub approximate: bool,
}

/// Both ends of a resolved range CFI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange<N> {
    pub start: ResolvedPosition<N>,
    pub end: ResolvedPosition<N>,
}

impl<N> ResolvedRange<N> {
    pub fn is_approximate(&self) -> bool {
        self.start.approximate || self.end.approximate
    }
}

/// Resolve a CFI to a position. Range CFIs resolve to their start.
pub fn resolve<T: DocumentTree + ?Sized>(
    tree: &T,
    cfi: &CanonicalAddress,
) -> Result<ResolvedPosition<T::Node>, CfiError> {
    resolve_path(tree, &cfi.start_path())
}

/// Resolve both ends of a CFI. Point CFIs yield a collapsed range.
pub fn resolve_range<T: DocumentTree + ?Sized>(
    tree: &T,
    cfi: &CanonicalAddress,
) -> Result<ResolvedRange<T::Node>, CfiError> {
    let start = resolve_path(tree, &cfi.start_path())?;
    let end = if cfi.is_range() {
        resolve_path(tree, &cfi.end_path())?
    } else {
        start
    };
    Ok(ResolvedRange { start, end })
}

/// Resolve a content-document path, starting at the root container
pub fn resolve_path<T: DocumentTree + ?Sized>(
    tree: &T,
    path: &AddressPath,
) -> Result<ResolvedPosition<T::Node>, CfiError> {
    let mut container = tree.root();

    for (depth, step) in path.steps.iter().enumerate() {
        let found = match step.kind {
            StepKind::Element => find_element(tree, container, step),
            StepKind::Text if depth + 1 != path.steps.len() => {
                return Err(CfiError::format(format!(
                    "text step {} is not the last step of {}",
                    step, path
                )));
            }
            StepKind::Text => {
                let run = text_run(tree, container, step.index);
                if !run.is_empty() {
                    return Ok(locate_in_run(tree, &run, path.terminal.offset));
                }
                None
            }
        };

        match found {
            Some(node) => container = node,
            None => return repair(tree, container, depth, path),
        }
    }

    Ok(ResolvedPosition {
        node: container,
        offset: path.terminal.offset,
        approximate: false,
    })
}

/// Id lookup first, normalized element index second
fn find_element<T: DocumentTree + ?Sized>(
    tree: &T,
    parent: T::Node,
    step: &AddressStep,
) -> Option<T::Node> {
    if let Some(id) = step.id.as_deref() {
        if let Some(node) = tree.element_by_id(id) {
            if !tree.is_ignorable(node) {
                return Some(node);
            }
        }
    }
    element_child(tree, parent, step.index)
}

/// Spread a run offset over the run's pieces. Offsets past the end of the
/// run clamp to its end.
fn locate_in_run<T: DocumentTree + ?Sized>(
    tree: &T,
    run: &[T::Node],
    offset: Option<usize>,
) -> ResolvedPosition<T::Node> {
    let mut remaining = offset.unwrap_or(0);

    for (i, &piece) in run.iter().enumerate() {
        let len = tree.text_len(piece);
        let last = i + 1 == run.len();
        if remaining <= len || last {
            let approximate = remaining > len;
            let local = remaining.min(len);
            let mut position = position_in_piece(tree, piece, local);
            if offset.is_none() {
                position.offset = None;
            }
            position.approximate = approximate;
            return position;
        }
        remaining -= len;
    }

    // run is never empty here
    ResolvedPosition {
        node: run[0],
        offset,
        approximate: true,
    }
}

/// Text pieces resolve directly; ignorable pieces hand the offset down to
/// their own text nodes
fn position_in_piece<T: DocumentTree + ?Sized>(
    tree: &T,
    piece: T::Node,
    offset: usize,
) -> ResolvedPosition<T::Node> {
    if tree.kind(piece) == NodeKind::Text {
        return ResolvedPosition {
            node: piece,
            offset: Some(offset),
            approximate: false,
        };
    }

    match descend_to_offset(tree, piece, offset) {
        Some((node, local, _)) => ResolvedPosition {
            node,
            offset: Some(local),
            approximate: false,
        },
        None => ResolvedPosition {
            node: piece,
            offset: None,
            approximate: false,
        },
    }
}

/// Re-anchor a CFI whose step at `depth` no longer matches
fn repair<T: DocumentTree + ?Sized>(
    tree: &T,
    ancestor: T::Node,
    depth: usize,
    path: &AddressPath,
) -> Result<ResolvedPosition<T::Node>, CfiError> {
    if depth == 0 {
        return Err(CfiError::AddressNotFound(format!(
            "first step of {} matches nothing",
            path
        )));
    }

    debug!(depth, path = %path, "CFI step missed, repairing against ancestor");

    let Some(offset) = path.terminal.offset else {
        return Ok(ResolvedPosition {
            node: ancestor,
            offset: None,
            approximate: true,
        });
    };

    Ok(match descend_to_offset(tree, ancestor, offset) {
        Some((node, local, _)) => ResolvedPosition {
            node,
            offset: Some(local),
            approximate: true,
        },
        None => ResolvedPosition {
            node: ancestor,
            offset: None,
            approximate: true,
        },
    })
}

/// Render steps as an XPath expression relative to the document root:
/// `./*/*[2]/text()[1]`, with id-bearing steps as
/// `*[position()=N and @id='ID']`.
///
/// Text steps are numbered by the gap between elements, so `text()[N]`
/// only matches the DOM where text and elements alternate.
pub fn to_xpath(steps: &[AddressStep]) -> String {
    let mut parts = vec![".".to_string(), "*".to_string()];
    for step in steps {
        let position = step.index + 1;
        let part = match (&step.id, step.kind) {
            (Some(id), _) => format!("*[position()={} and @id={}]", position, xpath_literal(id)),
            (None, StepKind::Text) => format!("text()[{}]", position),
            (None, StepKind::Element) => format!("*[{}]", position),
        };
        parts.push(part);
    }
    parts.join("/")
}

/// Quote a string as an XPath 1.0 literal. XPath has no escape syntax, so
/// a value holding both quote kinds is spliced together with `concat()`.
fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{}'", value);
    }
    if !value.contains('"') {
        return format!("\"{}\"", value);
    }
    let parts: Vec<String> = value.split('\'').map(|part| format!("'{}'", part)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfi::generator::{address_from_node, address_from_range};
    use crate::cfi::parser::parse;
    use crate::tree::{TreePosition, XhtmlDocument};

    const DOC: &str = r#"<html><head/><body id="body01"><p id="para01">Hello <em>there</em> world</p><p>Second paragraph</p></body></html>"#;

    fn base() -> AddressPath {
        AddressPath::section_base(2, 1, None)
    }

    #[test]
    fn test_resolve_text_offset() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/4/2/1:3)").unwrap();

        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(doc.text(position.node), Some("Hello "));
        assert_eq!(position.offset, Some(3));
        assert!(!position.approximate);
    }

    #[test]
    fn test_resolve_element() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/4/4)").unwrap();

        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(doc.text_content(position.node), "Second paragraph");
        assert_eq!(position.offset, None);
    }

    #[test]
    fn test_generate_then_resolve() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let p = doc.element_by_id("para01").unwrap();
        let world = doc.children(p)[2];

        let cfi = address_from_node(&doc, world, Some(4), &base()).unwrap();
        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(position.node, world);
        assert_eq!(position.offset, Some(4));
    }

    #[test]
    fn test_id_wins_over_index() {
        // para01 moved to second place: the id still finds it
        let doc = XhtmlDocument::parse(
            r#"<html><head/><body><p>New</p><p id="para01">Hello</p></body></html>"#,
        )
        .unwrap();
        let cfi = parse("epubcfi(/6/4!/4/2[para01]/1:1)").unwrap();

        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(doc.text(position.node), Some("Hello"));
    }

    #[test]
    fn test_resolve_through_ignorable_markup() {
        let doc = XhtmlDocument::parse_with_ignore_class(
            r#"<html><head/><body><p>Hello <span class="hl">there</span> world</p></body></html>"#,
            Some("hl"),
        )
        .unwrap();

        // "Hello there world" offset 8 lands inside the highlight
        let cfi = parse("epubcfi(/6/4!/4/2/1:8)").unwrap();
        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(doc.text(position.node), Some("there"));
        assert_eq!(position.offset, Some(2));
        assert!(!position.approximate);

        let cfi = parse("epubcfi(/6/4!/4/2/1:13)").unwrap();
        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(doc.text(position.node), Some(" world"));
        assert_eq!(position.offset, Some(2));
    }

    #[test]
    fn test_offset_past_run_is_clamped() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/4/4/1:500)").unwrap();

        let position = resolve(&doc, &cfi).unwrap();
        assert_eq!(position.offset, Some("Second paragraph".len()));
        assert!(position.approximate);
    }

    #[test]
    fn test_missing_step_is_repaired() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        // No sixth paragraph: fall back to body and walk its text
        let cfi = parse("epubcfi(/6/4!/4/12/1:8)").unwrap();

        let position = resolve(&doc, &cfi).unwrap();
        assert!(position.approximate);
        assert_eq!(doc.text(position.node), Some("there"));
        assert_eq!(position.offset, Some(2));
    }

    #[test]
    fn test_unresolvable_first_step() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/40/2/1:0)").unwrap();

        let err = resolve(&doc, &cfi).unwrap_err();
        assert!(err.is_stale());
    }

    #[test]
    fn test_resolve_range() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let p = doc.element_by_id("para01").unwrap();
        let hello = doc.children(p)[0];
        let world = doc.children(p)[2];

        let cfi = address_from_range(
            &doc,
            TreePosition::at(hello, 1),
            TreePosition::at(world, 3),
            &base(),
        )
        .unwrap();
        let range = resolve_range(&doc, &cfi).unwrap();

        assert_eq!(range.start.node, hello);
        assert_eq!(range.start.offset, Some(1));
        assert_eq!(range.end.node, world);
        assert_eq!(range.end.offset, Some(3));
        assert!(!range.is_approximate());
    }

    #[test]
    fn test_point_resolves_to_collapsed_range() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/4/2/1:2)").unwrap();
        let range = resolve_range(&doc, &cfi).unwrap();
        assert_eq!(range.start, range.end);
    }

    #[test]
    fn test_to_xpath() {
        let steps = vec![
            AddressStep::element(1),
            AddressStep::element_with_id(0, "para01"),
            AddressStep::text(0),
        ];
        assert_eq!(
            to_xpath(&steps),
            "./*/*[2]/*[position()=1 and @id='para01']/text()[1]"
        );
    }

    #[test]
    fn test_text_step_before_last_is_a_format_error() {
        let doc = XhtmlDocument::parse(DOC).unwrap();
        let cfi = parse("epubcfi(/6/4!/4/2/1/2:0)").unwrap();

        let err = resolve(&doc, &cfi).unwrap_err();
        assert!(matches!(err, CfiError::InvalidAddressFormat(_)));
        assert!(!err.is_stale());
    }

    #[test]
    fn test_to_xpath_quotes_ids() {
        let steps = vec![AddressStep::element_with_id(0, "o'brien")];
        assert_eq!(to_xpath(&steps), "./*/*[position()=1 and @id=\"o'brien\"]");

        let steps = vec![AddressStep::element_with_id(2, "a'b\"c")];
        assert_eq!(
            to_xpath(&steps),
            "./*/*[position()=3 and @id=concat('a', \"'\", 'b\"c')]"
        );
    }
}
