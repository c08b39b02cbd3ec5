//! Character-level CSV automaton
//!
//! The automaton owns the in-progress field and row and advances one
//! character at a time. It performs no I/O, so the same context can be
//! driven over a whole string or resumed across arbitrary chunk boundaries.
//!
//! Line endings are `\n` and `\r\n`. Detecting `\r\n` needs one character of
//! lookahead; when the pair is consumed the caller is told to skip the `\n`.

use crate::error::{CsvError, Result};
use crate::types::Delimiter;

/// The quote character
pub const QUOTE: char = '"';

/// Automaton state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseState {
    /// At the start of a field
    #[default]
    FieldStart,
    /// Inside a field that did not start with a quote
    UnquotedField,
    /// Inside a quoted field
    QuotedField,
    /// Just saw a quote inside a quoted field (closing or escape)
    QuoteInQuoted,
    /// After a closing quote; characters are discarded until a delimiter or line end
    FieldEnd,
}

/// Result of feeding one character
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// No row boundary yet
    Continue,
    /// A row was completed
    Row {
        fields: Vec<String>,
        /// The lookahead `\n` of a `\r\n` pair was consumed and must be skipped
        skip_next: bool,
    },
}

/// Mutable automaton context for one parse session
///
/// Not shareable between concurrent parses; each parse owns its own context.
#[derive(Debug, Clone)]
pub struct ParserContext {
    state: ParseState,
    field: String,
    row: Vec<String>,
    delimiter: char,
}

impl ParserContext {
    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            state: ParseState::FieldStart,
            field: String::new(),
            row: Vec::new(),
            delimiter: delimiter.as_char(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// True while inside an open quoted field
    pub fn in_quoted_field(&self) -> bool {
        self.state == ParseState::QuotedField
    }

    /// Feed one character with a one-character lookahead
    pub fn process_char(&mut self, ch: char, next: Option<char>) -> Step {
        match self.state {
            ParseState::FieldStart => {
                if ch == QUOTE {
                    self.state = ParseState::QuotedField;
                } else if ch == self.delimiter {
                    self.push_field();
                } else if let Some(skip_next) = line_end(ch, next) {
                    return self.end_row(skip_next);
                } else {
                    self.field.push(ch);
                    self.state = ParseState::UnquotedField;
                }
            }
            ParseState::UnquotedField => {
                if ch == self.delimiter {
                    self.push_field();
                    self.state = ParseState::FieldStart;
                } else if let Some(skip_next) = line_end(ch, next) {
                    return self.end_row(skip_next);
                } else {
                    self.field.push(ch);
                }
            }
            ParseState::QuotedField => {
                if ch == QUOTE {
                    self.state = ParseState::QuoteInQuoted;
                } else {
                    // Raw CR/LF inside quotes is data
                    self.field.push(ch);
                }
            }
            ParseState::QuoteInQuoted => {
                if ch == QUOTE {
                    self.field.push(QUOTE);
                    self.state = ParseState::QuotedField;
                } else if ch == self.delimiter {
                    self.push_field();
                    self.state = ParseState::FieldStart;
                } else if let Some(skip_next) = line_end(ch, next) {
                    return self.end_row(skip_next);
                } else {
                    self.state = ParseState::FieldEnd;
                }
            }
            ParseState::FieldEnd => {
                if ch == self.delimiter {
                    self.push_field();
                    self.state = ParseState::FieldStart;
                } else if let Some(skip_next) = line_end(ch, next) {
                    return self.end_row(skip_next);
                }
            }
        }
        Step::Continue
    }

    /// Drive the automaton over a complete string
    ///
    /// Completed rows are passed to `on_row`. Does not flush; call
    /// [`ParserContext::flush`] once input is exhausted.
    pub fn feed_str<F>(&mut self, text: &str, mut on_row: F)
    where
        F: FnMut(Vec<String>),
    {
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            let next = chars.peek().copied();
            if let Step::Row { fields, skip_next } = self.process_char(ch, next) {
                if skip_next {
                    chars.next();
                }
                on_row(fields);
            }
        }
    }

    /// Finish the session at end of input
    ///
    /// Fails if a quoted field is still open. Otherwise returns the pending
    /// row, if any field content or earlier fields are waiting.
    pub fn flush(&mut self) -> Result<Option<Vec<String>>> {
        if self.state == ParseState::QuotedField {
            return Err(CsvError::unclosed_quote(&self.field));
        }
        if self.field.is_empty() && self.row.is_empty() {
            self.state = ParseState::FieldStart;
            return Ok(None);
        }
        self.push_field();
        self.state = ParseState::FieldStart;
        Ok(Some(std::mem::take(&mut self.row)))
    }

    /// Drop any in-progress field and row
    pub fn reset(&mut self) {
        self.state = ParseState::FieldStart;
        self.field.clear();
        self.row.clear();
    }

    fn push_field(&mut self) {
        self.row.push(std::mem::take(&mut self.field));
    }

    fn end_row(&mut self, skip_next: bool) -> Step {
        self.push_field();
        self.state = ParseState::FieldStart;
        Step::Row {
            fields: std::mem::take(&mut self.row),
            skip_next,
        }
    }
}

// Some(skip_next) when `ch` terminates a row
fn line_end(ch: char, next: Option<char>) -> Option<bool> {
    match (ch, next) {
        ('\n', _) => Some(false),
        ('\r', Some('\n')) => Some(true),
        _ => None,
    }
}
