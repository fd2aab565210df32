//! Shared line cursor for the block-structured definition grammar.
//!
//! Every block parser receives the same cursor. A block consumes from its
//! opening directive through its matching `end` inclusive, so when a nested
//! parser returns, the caller's next [`LineCursor::advance`] yields the line
//! right after that `end`.

use crate::definition::error::{ParseError, ParseResult};

/// One non-blank line split as `keyword value` on the first whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    /// 1-based line number.
    pub line: usize,
    /// The first token as written.
    pub keyword: &'a str,
    /// Trimmed remainder, if any.
    pub value: Option<&'a str>,
    /// The whole trimmed line.
    pub text: &'a str,
}

impl<'a> Directive<'a> {
    fn from_line(index: usize, raw: &'a str) -> Option<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return None;
        }
        let (keyword, value) = match text.split_once(char::is_whitespace) {
            Some((k, rest)) => {
                let rest = rest.trim();
                (k, if rest.is_empty() { None } else { Some(rest) })
            }
            None => (text, None),
        };
        Some(Self {
            line: index + 1,
            keyword,
            value,
            text,
        })
    }

    /// Case-insensitive keyword comparison.
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    /// The value, or a hard error naming the keyword.
    pub fn value(&self) -> ParseResult<&'a str> {
        self.value.ok_or_else(|| ParseError::MissingValue {
            line: self.line,
            keyword: self.keyword.to_ascii_lowercase(),
        })
    }

    pub fn invalid(&self, value: &str, reason: impl Into<String>) -> ParseError {
        ParseError::InvalidValue {
            line: self.line,
            keyword: self.keyword.to_ascii_lowercase(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Where a block opened, kept for unterminated-block errors.
#[derive(Debug, Clone)]
pub struct BlockStart {
    pub name: String,
    pub line: usize,
}

impl BlockStart {
    pub fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line,
        }
    }

    pub fn of(directive: &Directive<'_>) -> Self {
        Self::new(directive.text.to_ascii_lowercase(), directive.line)
    }

    fn unterminated(&self) -> ParseError {
        ParseError::UnterminatedBlock {
            block: self.name.clone(),
            opened_at: self.line,
        }
    }
}

/// Forward-only cursor over the lines of one definition file.
#[derive(Debug)]
pub struct LineCursor<'a, S: AsRef<str>> {
    lines: &'a [S],
    pos: usize,
}

impl<'a, S: AsRef<str>> LineCursor<'a, S> {
    pub fn new(lines: &'a [S]) -> Self {
        Self { lines, pos: 0 }
    }

    /// Consume and return the next non-blank directive.
    pub fn advance(&mut self) -> Option<Directive<'a>> {
        let lines = self.lines;
        while self.pos < lines.len() {
            let index = self.pos;
            self.pos += 1;
            if let Some(d) = Directive::from_line(index, lines[index].as_ref()) {
                return Some(d);
            }
        }
        None
    }

    /// Next directive inside `block`.
    ///
    /// Returns `Ok(None)` once the block's `end` has been consumed and errors
    /// if the file ends first.
    pub fn next_in_block(&mut self, block: &BlockStart) -> ParseResult<Option<Directive<'a>>> {
        match self.advance() {
            Some(d) if d.is("end") => Ok(None),
            Some(d) => Ok(Some(d)),
            None => Err(block.unterminated()),
        }
    }
}
