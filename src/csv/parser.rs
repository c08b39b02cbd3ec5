//! Full-buffer CSV parsing with RFC 4180 behavior
//!
//! Runs the automaton over a complete string and assembles headers and
//! records. For chunked input use [`crate::stream::StreamParser`].

use crate::csv::detect::{decode_bytes, detect_delimiter};
use crate::csv::state_machine::ParserContext;
use crate::error::{CsvError, Result};
use crate::options::ParseOptions;
use crate::types::{is_blank_row, Delimiter, Document, ParseOutcome, ParsedRow};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// CSV parser for complete in-memory content
///
/// # Examples
///
/// ```
/// use streamcsv::{CsvParser, ParseOptions};
///
/// let parser = CsvParser::new(ParseOptions::new().has_headers(true));
/// let doc = parser.parse("id,name\n1,Alice\n2,Bob\n").unwrap();
///
/// assert_eq!(doc.headers, Some(vec!["id".to_string(), "name".to_string()]));
/// assert_eq!(doc.total_rows, 2);
/// assert_eq!(doc.rows[1].get_by_name("name"), Some("Bob"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvParser {
    options: ParseOptions,
}

impl CsvParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse complete content into a document
    ///
    /// Fails only on invalid options or when input ends inside a quoted field.
    pub fn parse(&self, content: &str) -> Result<Document> {
        self.options.validate()?;
        let delimiter = self
            .options
            .delimiter
            .unwrap_or_else(|| detect_delimiter(content));

        let mut ctx = ParserContext::new(delimiter);
        let mut rows: Vec<Vec<String>> = Vec::new();
        ctx.feed_str(content, |row| {
            if !is_blank_row(&row) {
                rows.push(row);
            }
        });
        if let Some(row) = ctx.flush()? {
            if !is_blank_row(&row) {
                rows.push(row);
            }
        }

        Ok(assemble(rows, delimiter, &self.options))
    }

    /// Decode a byte buffer (BOM-aware) and parse it
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Document> {
        let content = decode_bytes(bytes)?;
        self.parse(&content)
    }

    /// Parse, returning an outcome value instead of an error
    ///
    /// Never panics: a panic during parsing becomes a failure outcome.
    pub fn parse_safe(&self, content: &str) -> ParseOutcome {
        catch_panic(|| self.parse(content)).into()
    }

    /// Byte-buffer counterpart of [`CsvParser::parse_safe`]
    pub fn parse_bytes_safe(&self, bytes: &[u8]) -> ParseOutcome {
        catch_panic(|| self.parse_bytes(bytes)).into()
    }
}

/// Parse a single record into its fields
///
/// Line terminators inside quotes are kept; anything after an unquoted line
/// terminator starts a second record and is ignored.
pub fn parse_line(line: &str, delimiter: Delimiter) -> Result<Vec<String>> {
    let mut ctx = ParserContext::new(delimiter);
    let mut first: Option<Vec<String>> = None;
    ctx.feed_str(line, |row| {
        if first.is_none() {
            first = Some(row);
        }
    });
    let last = ctx.flush()?;
    Ok(first.or(last).unwrap_or_else(|| vec![String::new()]))
}

// Apply skip_rows, header selection, trimming and row indexing
fn assemble(rows: Vec<Vec<String>>, delimiter: Delimiter, options: &ParseOptions) -> Document {
    let mut remaining = rows.into_iter().skip(options.skip_rows);

    let headers = if options.has_headers {
        remaining
            .next()
            .map(|h| trim_row(h, options.trim_fields))
    } else {
        options.columns.clone()
    };

    let rows: Vec<ParsedRow> = remaining
        .filter(|r| !is_blank_row(r))
        .enumerate()
        .map(|(i, fields)| {
            ParsedRow::new(trim_row(fields, options.trim_fields), i, headers.as_deref())
        })
        .collect();

    Document {
        total_rows: rows.len(),
        headers,
        rows,
        delimiter,
    }
}

pub(crate) fn trim_row(fields: Vec<String>, trim: bool) -> Vec<String> {
    if !trim {
        return fields;
    }
    fields
        .into_iter()
        .map(|f| {
            let trimmed = f.trim();
            if trimmed.len() == f.len() {
                f
            } else {
                trimmed.to_string()
            }
        })
        .collect()
}

pub(crate) fn catch_panic<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "parser panicked".to_string());
            Err(CsvError::Internal(message))
        }
    }
}
