//! CFI Comparison and Ordering
//!
//! Reading-order comparison used to sort annotations and to binary-search
//! location indexes. Ids and assertions are ignored, so this order is not
//! `Ord` for [`CanonicalAddress`]; it is exposed as [`compare`] instead.

use std::cmp::Ordering;

use super::parser::parse;
use super::types::*;

/// Compare two CFIs in reading order.
///
/// Spine position first, then the wire number of each step (range
/// addresses compare by their start), a shorter step list before a longer
/// one it prefixes, and finally the terminal offset (absent counts as 0).
pub fn compare(a: &CanonicalAddress, b: &CanonicalAddress) -> Ordering {
    a.spine_position.cmp(&b.spine_position).then_with(|| {
        let (prefix_a, suffix_a, terminal_a) = ordering_key(a);
        let (prefix_b, suffix_b, terminal_b) = ordering_key(b);
        compare_steps(
            prefix_a.iter().chain(suffix_a),
            prefix_b.iter().chain(suffix_b),
        )
        .then_with(|| {
            terminal_a
                .offset
                .unwrap_or(0)
                .cmp(&terminal_b.offset.unwrap_or(0))
        })
    })
}

/// Steps and terminal an address is ordered by: path + start for ranges
fn ordering_key(cfi: &CanonicalAddress) -> (&[AddressStep], &[AddressStep], &Terminal) {
    match &cfi.range {
        Some(range) => (
            cfi.path.steps.as_slice(),
            range.start.steps.as_slice(),
            &range.start.terminal,
        ),
        None => (cfi.path.steps.as_slice(), &[][..], &cfi.path.terminal),
    }
}

/// Compare two sequences of CFI steps by wire number, so a text run sorts
/// between the elements on either side of it
fn compare_steps<'a>(
    mut a: impl Iterator<Item = &'a AddressStep>,
    mut b: impl Iterator<Item = &'a AddressStep>,
) -> Ordering {
    loop {
        match (a.next(), b.next()) {
            (Some(step_a), Some(step_b)) => match step_a.wire_index().cmp(&step_b.wire_index()) {
                Ordering::Equal => continue,
                other => return other,
            },
            // If all compared steps are equal, the longer path is "greater"
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

impl CanonicalAddress {
    /// Reading-order comparison, see [`compare`]
    pub fn compare(&self, other: &CanonicalAddress) -> Ordering {
        compare(self, other)
    }
}

/// Determine if CFI `a` comes before CFI `b` in reading order
pub fn is_before(a: &CanonicalAddress, b: &CanonicalAddress) -> bool {
    compare(a, b) == Ordering::Less
}

/// Determine if CFI `a` comes after CFI `b` in reading order
pub fn is_after(a: &CanonicalAddress, b: &CanonicalAddress) -> bool {
    compare(a, b) == Ordering::Greater
}

/// Check if a CFI falls within `start..=end`
pub fn is_in_range(cfi: &CanonicalAddress, start: &CanonicalAddress, end: &CanonicalAddress) -> bool {
    compare(cfi, start) != Ordering::Less && compare(cfi, end) != Ordering::Greater
}

/// Compare two CFI strings, returning their ordering.
/// Returns None if either CFI is invalid
pub fn compare_cfi_strings(a: &str, b: &str) -> Option<Ordering> {
    let cfi_a = parse(a).ok()?;
    let cfi_b = parse(b).ok()?;
    Some(compare(&cfi_a, &cfi_b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfi(s: &str) -> CanonicalAddress {
        parse(s).unwrap()
    }

    #[test]
    fn test_cfi_ordering_same_chapter() {
        let a = cfi("epubcfi(/6/4!/4/2/1:10)");
        let b = cfi("epubcfi(/6/4!/4/2/1:20)");

        assert_eq!(compare(&a, &b), Ordering::Less);
        assert!(is_before(&a, &b));
        assert!(is_after(&b, &a));
    }

    #[test]
    fn test_cfi_ordering_different_chapters() {
        let a = cfi("epubcfi(/6/4!/4/20/1:99)");
        let b = cfi("epubcfi(/6/6!/4/2)");

        assert_eq!(compare(&a, &b), Ordering::Less);
    }

    #[test]
    fn test_cfi_ordering_nested_depth() {
        let a = cfi("epubcfi(/6/4!/4/2)");
        let b = cfi("epubcfi(/6/4!/4/2/1)");

        // Deeper path comes after shallower path
        assert_eq!(compare(&a, &b), Ordering::Less);
        assert_eq!(compare(&b, &a), Ordering::Greater);
    }

    #[test]
    fn test_text_run_sorts_before_following_element() {
        // text /1 precedes element /2, text /3 follows it
        let text0 = cfi("epubcfi(/6/4!/4/2/1:5)");
        let elem0 = cfi("epubcfi(/6/4!/4/2/2/1:0)");
        let text1 = cfi("epubcfi(/6/4!/4/2/3:0)");

        assert!(is_before(&text0, &elem0));
        assert!(is_before(&elem0, &text1));
    }

    #[test]
    fn test_text_offset_sorts_before_next_element() {
        let text = cfi("epubcfi(/6/4!/4/2/3:40)");
        let elem = cfi("epubcfi(/6/4!/4/2/4)");
        let inside_prev = cfi("epubcfi(/6/4!/4/2/2/1:1)");

        assert!(is_before(&text, &elem));
        assert!(is_before(&inside_prev, &text));
    }

    #[test]
    fn test_ids_do_not_affect_order() {
        let a = cfi("epubcfi(/6/4[chap]!/4[body]/2/1:3)");
        let b = cfi("epubcfi(/6/4!/4/2/1:3)");
        assert_eq!(compare(&a, &b), Ordering::Equal);
        assert_ne!(a, b);
    }

    #[test]
    fn test_range_compares_by_start() {
        let range = cfi("epubcfi(/6/4!/4/2,/1:10,/1:50)");
        let inside = cfi("epubcfi(/6/4!/4/2/1:20)");
        let before = cfi("epubcfi(/6/4!/4/2/1:5)");

        assert!(is_before(&range, &inside));
        assert!(is_after(&range, &before));
        assert_eq!(compare(&range, &range.collapse(true)), Ordering::Equal);
    }

    #[test]
    fn test_cfi_in_range() {
        let start = cfi("epubcfi(/6/4!/4/2/1:0)");
        let end = cfi("epubcfi(/6/4!/4/2/1:100)");
        let middle = cfi("epubcfi(/6/4!/4/2/1:50)");
        let outside = cfi("epubcfi(/6/4!/4/2/1:150)");

        assert!(is_in_range(&middle, &start, &end));
        assert!(is_in_range(&start, &start, &end));
        assert!(!is_in_range(&outside, &start, &end));
    }

    #[test]
    fn test_sort_cfis() {
        let mut cfis = vec![
            cfi("epubcfi(/6/8!/4/2/1:50)"),
            cfi("epubcfi(/6/4!/4/2/1:10)"),
            cfi("epubcfi(/6/6!/4/2/1:30)"),
            cfi("epubcfi(/6/4!/4/2/1:5)"),
        ];

        cfis.sort_by(compare);

        assert_eq!(cfis[0].to_string(), "epubcfi(/6/4!/4/2/1:5)");
        assert_eq!(cfis[1].to_string(), "epubcfi(/6/4!/4/2/1:10)");
        assert_eq!(cfis[2].to_string(), "epubcfi(/6/6!/4/2/1:30)");
        assert_eq!(cfis[3].to_string(), "epubcfi(/6/8!/4/2/1:50)");
    }

    #[test]
    fn test_compare_cfi_strings() {
        assert_eq!(
            compare_cfi_strings("epubcfi(/6/4!/4/2/1:10)", "epubcfi(/6/4!/4/2/1:20)"),
            Some(Ordering::Less)
        );
        assert_eq!(compare_cfi_strings("invalid", "epubcfi(/6/4!/4/2)"), None);
    }
}
