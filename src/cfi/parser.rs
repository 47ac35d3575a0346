//! CFI Parser
//!
//! Parses EPUB CFI strings into structured [`CanonicalAddress`] values.
//!
//! Grammar:
//! ```text
//! cfi       = "epubcfi(" base "!" path ["," start "," end] ")"
//! base      = step step+ [offset]
//! path      = step* [offset]          (at least one step unless a range follows)
//! start/end = step+ [offset]
//! step      = "/" number [id]
//! id        = "[" text "]"
//! offset    = ":" number [assertion]
//! assertion = "[" text "]"
//! ```
//!
//! The `epubcfi(...)` wrapper is checked by [`is_cfi_string`] before any
//! structural parsing happens.

use super::error::CfiError;
use super::types::*;

const PREFIX: &str = "epubcfi(";

/// Whether a string carries the `epubcfi(...)` wrapper
pub fn is_cfi_string(input: &str) -> bool {
    input.starts_with(PREFIX) && input.ends_with(')') && input.len() > PREFIX.len()
}

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), CfiError> {
        if self.skip_if(expected) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{}'", expected)))
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn unexpected(&self, wanted: &str) -> CfiError {
        match self.peek() {
            Some(ch) => CfiError::format(format!(
                "expected {} at position {}, found '{}'",
                wanted, self.pos, ch
            )),
            None => CfiError::format(format!(
                "expected {} at position {}, found end of input",
                wanted, self.pos
            )),
        }
    }

    /// Parse a sequence of digits
    fn parse_number(&mut self) -> Result<usize, CfiError> {
        let start = self.pos;
        while matches!(self.peek(), Some(ch) if ch.is_ascii_digit()) {
            self.advance();
        }

        if self.pos == start {
            return Err(self.unexpected("number"));
        }

        self.input[start..self.pos]
            .parse()
            .map_err(|_| CfiError::format(format!("number out of range at position {}", start)))
    }

    /// Parse text inside brackets, handling `^` escapes. The opening
    /// bracket has already been consumed; the closing one is consumed here.
    fn parse_bracket_content(&mut self) -> Result<String, CfiError> {
        let start = self.pos;
        let mut result = String::new();
        let mut escaped = false;

        while let Some(ch) = self.advance() {
            if escaped {
                result.push(ch);
                escaped = false;
            } else if ch == '^' {
                escaped = true;
            } else if ch == ']' {
                return Ok(result);
            } else if ch == '[' {
                return Err(CfiError::format(format!(
                    "unescaped '[' at position {}",
                    self.pos - 1
                )));
            } else {
                result.push(ch);
            }
        }

        Err(CfiError::format(format!(
            "unclosed bracket starting at position {}",
            start
        )))
    }

    fn parse_optional_bracket(&mut self) -> Result<Option<String>, CfiError> {
        if self.skip_if('[') {
            self.parse_bracket_content().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Parse a single `/N[id]` step
    fn parse_step(&mut self) -> Result<AddressStep, CfiError> {
        self.expect('/')?;
        let start = self.pos;
        let number = self.parse_number()?;
        let id = self.parse_optional_bracket()?;

        AddressStep::from_wire(number, id).ok_or_else(|| {
            CfiError::format(format!("step index {} at position {} names no node", number, start))
        })
    }

    /// Parse a component (sequence of steps with optional terminal)
    fn parse_component(&mut self) -> Result<AddressPath, CfiError> {
        let mut path = AddressPath::new();

        while self.peek() == Some('/') {
            path.push(self.parse_step()?);
        }

        if self.skip_if(':') {
            path.terminal.offset = Some(self.parse_number()?);
            path.terminal.assertion = self.parse_optional_bracket()?;
        }

        Ok(path)
    }

    /// Parse everything between the wrapper parentheses
    fn parse_body(&mut self) -> Result<CanonicalAddress, CfiError> {
        let base = self.parse_component()?;
        if base.steps.len() < 2 {
            return Err(CfiError::format(
                "base must address a spine item (at least two steps)",
            ));
        }

        if !self.skip_if('!') {
            return Err(self.unexpected("'!'"));
        }

        let path = self.parse_component()?;

        let address = if self.skip_if(',') {
            let start = self.parse_component()?;
            self.expect(',')?;
            let end = self.parse_component()?;
            if start.steps.is_empty() || end.steps.is_empty() {
                return Err(CfiError::format("range start and end need at least one step"));
            }
            CanonicalAddress::with_range(base, path, start, end)?
        } else {
            if path.steps.is_empty() {
                return Err(CfiError::format("path after '!' has no steps"));
            }
            CanonicalAddress::new(base, path)?
        };

        if !self.at_end() {
            return Err(self.unexpected("end of CFI"));
        }

        Ok(address)
    }
}

/// Parse a CFI string into a [`CanonicalAddress`]
pub fn parse(input: &str) -> Result<CanonicalAddress, CfiError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CfiError::format("empty CFI string"));
    }
    if !is_cfi_string(input) {
        return Err(CfiError::format("CFI must be wrapped in 'epubcfi(...)'"));
    }

    let inner = &input[PREFIX.len()..input.len() - 1];
    Parser::new(inner).parse_body()
}

/// Parse a CFI string, returning `None` on failure
pub fn try_parse(input: &str) -> Option<CanonicalAddress> {
    parse(input).ok()
}

/// Parse a bare component like `/6/4[chap01ref]` or `/4/2/1:3`
pub(crate) fn parse_component(input: &str) -> Result<AddressPath, CfiError> {
    let mut parser = Parser::new(input.trim());
    let path = parser.parse_component()?;
    if !parser.at_end() {
        return Err(parser.unexpected("end of component"));
    }
    if path.steps.is_empty() {
        return Err(CfiError::format("component has no steps"));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reference_example() {
        let input = "epubcfi(/6/4[chap01ref]!/4[body01]/10[para05]/2/1:3)";
        let cfi = parse(input).unwrap();

        assert_eq!(
            cfi.base.steps,
            vec![
                AddressStep::element(2),
                AddressStep::element_with_id(1, "chap01ref"),
            ]
        );
        assert_eq!(
            cfi.path.steps,
            vec![
                AddressStep::element_with_id(1, "body01"),
                AddressStep::element_with_id(4, "para05"),
                AddressStep::element(0),
                AddressStep::text(0),
            ]
        );
        assert_eq!(cfi.path.terminal.offset, Some(3));
        assert_eq!(cfi.spine_position, 1);
        assert!(!cfi.is_range());
        assert_eq!(cfi.to_string(), input);
    }

    #[test]
    fn test_parse_range() {
        let cfi = parse("epubcfi(/6/4!/4/2,/1:0,/1:10)").unwrap();
        assert!(cfi.is_range());
        let range = cfi.range.as_ref().unwrap();
        assert_eq!(range.start.terminal.offset, Some(0));
        assert_eq!(range.end.terminal.offset, Some(10));
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2,/1:0,/1:10)");
    }

    #[test]
    fn test_parse_range_with_empty_prefix() {
        let cfi = parse("epubcfi(/6/4!,/4/1:0,/6/1:5)").unwrap();
        assert!(cfi.path.steps.is_empty());
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!,/4/1:0,/6/1:5)");
    }

    #[test]
    fn test_parse_terminal_assertion() {
        let cfi = parse("epubcfi(/6/4!/4/2/1:42[hello^,world])").unwrap();
        assert_eq!(cfi.path.terminal.assertion.as_deref(), Some("hello,world"));
        assert_eq!(cfi.to_string(), "epubcfi(/6/4!/4/2/1:42[hello^,world])");
    }

    #[test]
    fn test_escaped_bracket() {
        let cfi = parse("epubcfi(/6/4[test^]value]!/4)").unwrap();
        assert_eq!(cfi.base.steps[1].id.as_deref(), Some("test]value"));
    }

    #[test]
    fn test_missing_wrapper_is_rejected() {
        assert!(!is_cfi_string("/6/4!/4"));
        assert!(matches!(
            parse("/6/4!/4"),
            Err(CfiError::InvalidAddressFormat(_))
        ));
        assert!(matches!(
            parse("epubcfi(/6/4!/4"),
            Err(CfiError::InvalidAddressFormat(_))
        ));
        assert!(matches!(parse(""), Err(CfiError::InvalidAddressFormat(_))));
    }

    #[test]
    fn test_malformed_steps_are_rejected() {
        for input in [
            "epubcfi(/6/4!/4/x)",
            "epubcfi(/6/4!/4/0)",
            "epubcfi(/6!/4)",
            "epubcfi(/6/4)",
            "epubcfi(/6/4!)",
            "epubcfi(/6/4!/4[open)",
            "epubcfi(/6/4!/4,/2)",
            "epubcfi(/6/4!/4/2:)",
            "epubcfi(/6/4!/4/2 )",
        ] {
            assert!(
                matches!(parse(input), Err(CfiError::InvalidAddressFormat(_))),
                "{} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_parse_component() {
        let base = parse_component("/6/4[chap01ref]").unwrap();
        assert_eq!(base, AddressPath::section_base(2, 1, Some("chap01ref")));
        assert!(parse_component("").is_err());
        assert!(parse_component("/6/4!").is_err());
    }

    #[test]
    fn test_try_parse() {
        assert!(try_parse("epubcfi(/6/2!/4)").is_some());
        assert!(try_parse("chapter1.xhtml").is_none());
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let cfi = parse("  epubcfi(/6/2!/4/1:0)\n").unwrap();
        assert_eq!(cfi.to_string(), "epubcfi(/6/2!/4/1:0)");
    }
}
