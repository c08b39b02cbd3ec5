//! CSV field escaping and row encoding with RFC 4180 behavior

use crate::csv::state_machine::QUOTE;
use crate::types::Delimiter;
use std::borrow::Cow;

/// Check if a field must be quoted to survive a parse
///
/// True when the field contains the delimiter, a quote, CR or LF.
pub fn needs_quoting(field: &str, delimiter: Delimiter) -> bool {
    let delim = delimiter.as_char();
    field
        .chars()
        .any(|c| c == delim || c == QUOTE || c == '\n' || c == '\r')
}

/// Escape a single field
///
/// Wraps the value in quotes and doubles interior quotes when `always_quote`
/// is set or the value needs quoting; otherwise returns it unchanged.
///
/// # Examples
///
/// ```
/// use streamcsv::{escape_field, Delimiter};
///
/// assert_eq!(escape_field("plain", Delimiter::COMMA, false), "plain");
/// assert_eq!(escape_field("a,b", Delimiter::COMMA, false), "\"a,b\"");
/// assert_eq!(escape_field(r#"say "hi""#, Delimiter::COMMA, false), r#""say ""hi""""#);
/// ```
pub fn escape_field(value: &str, delimiter: Delimiter, always_quote: bool) -> Cow<'_, str> {
    if !always_quote && !needs_quoting(value, delimiter) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 2);
    push_quoted(value, &mut out);
    Cow::Owned(out)
}

fn push_quoted(value: &str, out: &mut String) {
    out.push(QUOTE);
    for ch in value.chars() {
        if ch == QUOTE {
            // Escape quotes by doubling: " -> ""
            out.push(QUOTE);
        }
        out.push(ch);
    }
    out.push(QUOTE);
}

/// CSV encoder for writing properly formatted rows
#[derive(Debug, Clone, Copy)]
pub struct CsvEncoder {
    delimiter: Delimiter,
    always_quote: bool,
}

impl CsvEncoder {
    /// Create a new encoder with a delimiter and quoting policy
    pub fn new(delimiter: Delimiter, always_quote: bool) -> Self {
        Self {
            delimiter,
            always_quote,
        }
    }

    /// Encode an entire row into buffer
    pub fn encode_row<S: AsRef<str>>(&self, fields: &[S], buffer: &mut String) {
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                buffer.push(self.delimiter.as_char());
            }
            self.encode_field(field.as_ref(), buffer);
        }
    }

    /// Encode a row straight into a reused byte buffer
    ///
    /// Appends to `buffer` without allocating once it has grown to row size.
    pub fn encode_row_bytes<I, S>(&self, fields: I, buffer: &mut Vec<u8>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut delim = [0u8; 4];
        let delim: &[u8] = self.delimiter.as_char().encode_utf8(&mut delim).as_bytes();
        for (i, field) in fields.into_iter().enumerate() {
            if i > 0 {
                buffer.extend_from_slice(delim);
            }
            self.encode_field_bytes(field.as_ref(), buffer);
        }
    }

    fn encode_field_bytes(&self, field: &str, buffer: &mut Vec<u8>) {
        if !self.always_quote && !needs_quoting(field, self.delimiter) {
            buffer.extend_from_slice(field.as_bytes());
            return;
        }
        buffer.push(b'"');
        for &b in field.as_bytes() {
            if b == b'"' {
                buffer.push(b'"');
            }
            buffer.push(b);
        }
        buffer.push(b'"');
    }

    /// Encode single field with proper quoting/escaping
    fn encode_field(&self, field: &str, buffer: &mut String) {
        if self.always_quote || needs_quoting(field, self.delimiter) {
            push_quoted(field, buffer);
        } else {
            buffer.push_str(field);
        }
    }
}
