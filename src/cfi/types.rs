//! CFI (Canonical Fragment Identifier) types
//!
//! Format: epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/3:10)
//!
//! Steps are stored decoded: `index` is the position among same-kind
//! siblings, and the even/odd wire number is only produced on output.
//!
//! Reference: <https://idpf.org/epub/linking/cfi/epub-cfi.html>

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::CfiError;

/// Kind of node a step points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Element child (even wire numbers)
    Element,
    /// Text run (odd wire numbers)
    Text,
}

/// A single step in a CFI path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressStep {
    pub kind: StepKind,
    /// Position among same-kind siblings (0-based)
    pub index: usize,
    /// Optional ID assertion [id]
    pub id: Option<String>,
}

/// End of a path: character offset and text assertion
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Terminal {
    /// Character offset into the addressed text run
    pub offset: Option<usize>,
    /// Expected text at the offset, kept verbatim
    pub assertion: Option<String>,
}

/// A CFI path component (sequence of steps plus terminal)
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AddressPath {
    pub steps: Vec<AddressStep>,
    pub terminal: Terminal,
}

/// Start and end of a range, relative to the shared path prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub start: AddressPath,
    pub end: AddressPath,
}

/// A complete EPUB CFI
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalAddress {
    /// Package document path selecting the spine item
    pub base: AddressPath,
    /// Path inside the content document; the shared prefix for ranges
    pub path: AddressPath,
    /// 0-based spine index, taken from the second base step
    pub spine_position: usize,
    /// Range suffixes, present only for range addresses
    pub range: Option<AddressRange>,
}

impl StepKind {
    /// Kind implied by a wire number
    pub fn from_wire(n: usize) -> Self {
        if n % 2 == 0 {
            StepKind::Element
        } else {
            StepKind::Text
        }
    }
}

impl AddressStep {
    /// Create an element step from a child index
    pub fn element(index: usize) -> Self {
        Self {
            kind: StepKind::Element,
            index,
            id: None,
        }
    }

    /// Create an element step with ID assertion
    pub fn element_with_id(index: usize, id: impl Into<String>) -> Self {
        Self {
            kind: StepKind::Element,
            index,
            id: Some(id.into()),
        }
    }

    /// Create a text step from a text run index
    pub fn text(index: usize) -> Self {
        Self {
            kind: StepKind::Text,
            index,
            id: None,
        }
    }

    /// Decode a wire number: even → element `n/2 - 1`, odd → text `(n-1)/2`.
    ///
    /// Returns `None` for 0, which names no node.
    pub fn from_wire(n: usize, id: Option<String>) -> Option<Self> {
        let kind = StepKind::from_wire(n);
        let index = match kind {
            StepKind::Element => (n / 2).checked_sub(1)?,
            StepKind::Text => (n - 1) / 2,
        };
        Some(Self { kind, index, id })
    }

    /// Encode the step: element `(i + 1) * 2`, text `i * 2 + 1`
    pub fn wire_index(&self) -> usize {
        match self.kind {
            StepKind::Element => (self.index + 1) * 2,
            StepKind::Text => self.index * 2 + 1,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == StepKind::Text
    }
}

/// Kind, index and id equality; the original step comparison used when
/// factoring ranges
pub fn equal_step(a: &AddressStep, b: &AddressStep) -> bool {
    a.kind == b.kind && a.index == b.index && a.id == b.id
}

impl Terminal {
    pub fn at(offset: usize) -> Self {
        Self {
            offset: Some(offset),
            assertion: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_none() && self.assertion.is_none()
    }
}

impl AddressPath {
    /// Create an empty path
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path with steps
    pub fn with_steps(steps: Vec<AddressStep>) -> Self {
        Self {
            steps,
            terminal: Terminal::default(),
        }
    }

    /// Add a step to the path
    pub fn push(&mut self, step: AddressStep) {
        self.steps.push(step);
    }

    /// Set the character offset
    pub fn set_offset(&mut self, offset: usize) {
        self.terminal.offset = Some(offset);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Chapter component for a spine item:
    /// `/<2*(spine_node_index+1)>/<2*(position+1)>[id]`
    pub fn section_base(spine_node_index: usize, position: usize, id: Option<&str>) -> Self {
        Self::with_steps(vec![
            AddressStep::element(spine_node_index),
            AddressStep {
                kind: StepKind::Element,
                index: position,
                id: id.map(str::to_string),
            },
        ])
    }

    /// Parse a bare component such as a section base `/6/4[chap01ref]`
    pub fn parse(input: &str) -> Result<Self, CfiError> {
        super::parser::parse_component(input)
    }

    /// Steps of `self` followed by the steps and terminal of `suffix`
    pub fn joined(&self, suffix: &AddressPath) -> AddressPath {
        let mut steps = self.steps.clone();
        steps.extend(suffix.steps.iter().cloned());
        AddressPath {
            steps,
            terminal: suffix.terminal.clone(),
        }
    }
}

impl CanonicalAddress {
    /// Create a non-range address. The base must carry the spine step.
    pub fn new(base: AddressPath, path: AddressPath) -> Result<Self, CfiError> {
        let spine_position = spine_position(&base)?;
        Ok(Self {
            base,
            path,
            spine_position,
            range: None,
        })
    }

    /// Create a range address from a shared prefix and two suffixes
    pub fn with_range(
        base: AddressPath,
        path: AddressPath,
        start: AddressPath,
        end: AddressPath,
    ) -> Result<Self, CfiError> {
        let spine_position = spine_position(&base)?;
        Ok(Self {
            base,
            path,
            spine_position,
            range: Some(AddressRange { start, end }),
        })
    }

    /// Check if this CFI represents a range (text selection)
    pub fn is_range(&self) -> bool {
        self.range.is_some()
    }

    /// Full path of the range start (or the path itself for points)
    pub fn start_path(&self) -> AddressPath {
        match &self.range {
            Some(range) => self.path.joined(&range.start),
            None => self.path.clone(),
        }
    }

    /// Full path of the range end (or the path itself for points)
    pub fn end_path(&self) -> AddressPath {
        match &self.range {
            Some(range) => self.path.joined(&range.end),
            None => self.path.clone(),
        }
    }

    /// Collapse a range onto its start or end, producing a point address.
    /// Point addresses are returned unchanged.
    pub fn collapse(&self, to_start: bool) -> CanonicalAddress {
        let path = if to_start {
            self.start_path()
        } else {
            self.end_path()
        };
        CanonicalAddress {
            base: self.base.clone(),
            path,
            spine_position: self.spine_position,
            range: None,
        }
    }
}

fn spine_position(base: &AddressPath) -> Result<usize, CfiError> {
    base.steps.get(1).map(|step| step.index).ok_or_else(|| {
        CfiError::InvalidAddressFormat("base is missing the spine item step".to_string())
    })
}

// Display implementations for serialization

/// Characters that must be escaped inside bracketed assertions
const ESCAPED: &[char] = &['^', '[', ']', '(', ')', ',', ';', '='];

struct Escaped<'a>(&'a str);

impl fmt::Display for Escaped<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            if ESCAPED.contains(&ch) {
                write!(f, "^")?;
            }
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

impl fmt::Display for AddressStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.wire_index())?;
        if let Some(ref id) = self.id {
            write!(f, "[{}]", Escaped(id))?;
        }
        Ok(())
    }
}

impl fmt::Display for AddressPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "{}", step)?;
        }
        if let Some(offset) = self.terminal.offset {
            write!(f, ":{}", offset)?;
            if let Some(ref assertion) = self.terminal.assertion {
                write!(f, "[{}]", Escaped(assertion))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for CanonicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "epubcfi({}!{}", self.base, self.path)?;
        if let Some(ref range) = self.range {
            write!(f, ",{},{}", range.start, range.end)?;
        }
        write!(f, ")")
    }
}

impl FromStr for CanonicalAddress {
    type Err = CfiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse(s)
    }
}

// The interchange format is the string form, so serde goes through it too.

impl Serialize for CanonicalAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for CanonicalAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AddressPath {
        AddressPath::section_base(2, 1, Some("chap01ref"))
    }

    #[test]
    fn test_wire_encoding() {
        assert_eq!(AddressStep::element(0).wire_index(), 2);
        assert_eq!(AddressStep::element(4).wire_index(), 10);
        assert_eq!(AddressStep::text(0).wire_index(), 1);
        assert_eq!(AddressStep::text(3).wire_index(), 7);

        assert_eq!(AddressStep::from_wire(10, None), Some(AddressStep::element(4)));
        assert_eq!(AddressStep::from_wire(7, None), Some(AddressStep::text(3)));
        assert_eq!(AddressStep::from_wire(0, None), None);
    }

    #[test]
    fn test_simple_cfi_display() {
        let path = AddressPath::with_steps(vec![
            AddressStep::element_with_id(1, "body01"),
            AddressStep::element(0),
        ]);
        let cfi = CanonicalAddress::new(base(), path).unwrap();

        assert_eq!(cfi.to_string(), "epubcfi(/6/4[chap01ref]!/4[body01]/2)");
        assert_eq!(cfi.spine_position, 1);
    }

    #[test]
    fn test_cfi_with_character_offset() {
        let mut path = AddressPath::with_steps(vec![
            AddressStep::element(1),
            AddressStep::element(0),
            AddressStep::text(0),
        ]);
        path.set_offset(42);

        let cfi = CanonicalAddress::new(AddressPath::section_base(2, 1, None), path).unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2/1:42)");
    }

    #[test]
    fn test_assertions_are_escaped() {
        let mut path = AddressPath::with_steps(vec![AddressStep::element_with_id(0, "a]b")]);
        path.terminal = Terminal {
            offset: Some(3),
            assertion: Some("x,y".to_string()),
        };
        let cfi = CanonicalAddress::new(base(), path).unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/4[chap01ref]!/2[a^]b]:3[x^,y])");
    }

    #[test]
    fn test_missing_spine_step() {
        let base = AddressPath::with_steps(vec![AddressStep::element(2)]);
        assert!(matches!(
            CanonicalAddress::new(base, AddressPath::new()),
            Err(CfiError::InvalidAddressFormat(_))
        ));
    }

    #[test]
    fn test_collapse() {
        let mut start = AddressPath::with_steps(vec![AddressStep::text(0)]);
        start.set_offset(1);
        let mut end = AddressPath::with_steps(vec![AddressStep::text(0)]);
        end.set_offset(9);
        let prefix = AddressPath::with_steps(vec![AddressStep::element(1), AddressStep::element(3)]);
        let range = CanonicalAddress::with_range(base(), prefix, start, end).unwrap();

        let to_start = range.collapse(true);
        assert!(!to_start.is_range());
        assert_eq!(to_start.to_string(), "epubcfi(/6/4[chap01ref]!/4/8/1:1)");

        let to_end = range.collapse(false);
        assert_eq!(to_end.to_string(), "epubcfi(/6/4[chap01ref]!/4/8/1:9)");

        // the original is untouched
        assert!(range.is_range());
    }
}
