//! Type definitions for parsed and generated CSV data

use crate::error::{CsvError, Result};
use crate::options::RESERVED_KEYS;
use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use std::fmt;

/// A validated field delimiter
///
/// Always exactly one character, never the quote character and never a line
/// terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "char", into = "char")
)]
pub struct Delimiter(char);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(',');
    pub const SEMICOLON: Delimiter = Delimiter(';');
    pub const PIPE: Delimiter = Delimiter('|');
    pub const TAB: Delimiter = Delimiter('\t');

    /// Get the delimiter character
    pub fn as_char(&self) -> char {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::COMMA
    }
}

impl TryFrom<char> for Delimiter {
    type Error = CsvError;

    fn try_from(ch: char) -> Result<Self> {
        match ch {
            '"' => Err(CsvError::InvalidOption(
                "delimiter cannot be the quote character".to_string(),
            )),
            '\r' | '\n' => Err(CsvError::InvalidOption(
                "delimiter cannot be a line terminator".to_string(),
            )),
            _ => Ok(Delimiter(ch)),
        }
    }
}

impl TryFrom<&str> for Delimiter {
    type Error = CsvError;

    fn try_from(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Delimiter::try_from(ch),
            _ => Err(CsvError::InvalidOption(format!(
                "delimiter must be exactly one character, got {:?}",
                s
            ))),
        }
    }
}

impl From<Delimiter> for char {
    fn from(d: Delimiter) -> Self {
        d.0
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from header name to field value
pub type Record = IndexMap<String, String>;

/// Check whether a header name may become a record key
pub fn is_reserved_key(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// Build a record from headers and positional fields
///
/// Reserved header names are dropped. Headers past the end of the row map to
/// an empty string.
pub fn build_record(headers: &[String], fields: &[String]) -> Record {
    let mut record = Record::with_capacity(headers.len());
    for (i, header) in headers.iter().enumerate() {
        if is_reserved_key(header) {
            continue;
        }
        let value = fields.get(i).cloned().unwrap_or_default();
        record.insert(header.clone(), value);
    }
    record
}

/// A data row with its position and optional keyed view
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParsedRow {
    /// Positional field values
    pub fields: Vec<String>,
    /// Zero-based index among data rows (after skipped and header rows)
    pub row_index: usize,
    /// Header-keyed values, present when headers are known
    pub record: Option<Record>,
}

impl ParsedRow {
    /// Create a row, building its record when headers are known
    pub fn new(fields: Vec<String>, row_index: usize, headers: Option<&[String]>) -> Self {
        let record = headers.map(|h| build_record(h, &fields));
        ParsedRow {
            fields,
            row_index,
            record,
        }
    }

    /// Get field at column index
    pub fn get(&self, col: usize) -> Option<&str> {
        self.fields.get(col).map(String::as_str)
    }

    /// Get field by header name
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        self.record
            .as_ref()
            .and_then(|r| r.get(name))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// A blank row is exactly one empty field
    pub fn is_blank(&self) -> bool {
        is_blank_row(&self.fields)
    }
}

pub(crate) fn is_blank_row(fields: &[String]) -> bool {
    fields.len() == 1 && fields[0].is_empty()
}

/// Fully parsed CSV content
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub headers: Option<Vec<String>>,
    pub rows: Vec<ParsedRow>,
    /// Delimiter used, either supplied or detected
    pub delimiter: Delimiter,
    /// Number of data rows (header row excluded)
    pub total_rows: usize,
}

impl Document {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Collect one column's values by header name
    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let headers = self.headers.as_ref()?;
        let idx = headers.iter().position(|h| h == name)?;
        Some(
            self.rows
                .iter()
                .map(|r| r.get(idx).unwrap_or(""))
                .collect(),
        )
    }

    /// Iterate keyed records (empty when headers are unknown)
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.rows.iter().filter_map(|r| r.record.as_ref())
    }

    /// Positional fields of every row
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(|r| r.fields.clone()).collect()
    }
}

/// Outcome of a non-throwing parse
#[derive(Debug)]
pub enum ParseOutcome {
    Success(Document),
    Failure(CsvError),
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ParseOutcome::Success(_))
    }

    pub fn data(&self) -> Option<&Document> {
        match self {
            ParseOutcome::Success(doc) => Some(doc),
            ParseOutcome::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&CsvError> {
        match self {
            ParseOutcome::Success(_) => None,
            ParseOutcome::Failure(e) => Some(e),
        }
    }

    pub fn into_result(self) -> Result<Document> {
        match self {
            ParseOutcome::Success(doc) => Ok(doc),
            ParseOutcome::Failure(e) => Err(e),
        }
    }
}

impl From<Result<Document>> for ParseOutcome {
    fn from(result: Result<Document>) -> Self {
        match result {
            Ok(doc) => ParseOutcome::Success(doc),
            Err(e) => ParseOutcome::Failure(e),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ParseOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("ParseOutcome", 2)?;
        match self {
            ParseOutcome::Success(doc) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", doc)?;
            }
            ParseOutcome::Failure(e) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &e.to_string())?;
            }
        }
        state.end()
    }
}

/// Structural event produced by the streaming drivers
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StreamEvent {
    /// Header names, emitted once before any row
    Headers(Vec<String>),
    /// One data row
    Row(ParsedRow),
    /// Terminal event
    Complete {
        total_rows: usize,
        delimiter: Delimiter,
    },
}

/// Event produced by the multi-file batch driver
#[derive(Debug)]
pub enum BatchEvent {
    FileStart {
        file: String,
        index: usize,
    },
    Headers {
        file: String,
        headers: Vec<String>,
    },
    Row {
        file: String,
        row: ParsedRow,
    },
    FileComplete {
        file: String,
        total_rows: usize,
        delimiter: Delimiter,
    },
    /// Failure of one file; the batch continues with the next
    FileError {
        file: String,
        error: CsvError,
    },
    BatchComplete(BatchSummary),
}

/// Totals reported at the end of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatchSummary {
    pub files: usize,
    pub total_rows: usize,
    pub errors: usize,
}

/// Typed value for generator input
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Missing value (null/undefined)
    Empty,
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Rendered as ISO-8601 with millisecond precision
    DateTime(DateTime<Utc>),
    /// Arbitrary structured value
    Json(serde_json::Value),
}

impl FieldValue {
    /// Coerce to the text written into a CSV field
    pub fn as_field(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::String(s) => s.clone(),
            FieldValue::Int(i) => itoa::Buffer::new().format(*i).to_string(),
            FieldValue::Float(f) => format_float(*f),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::DateTime(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            FieldValue::Json(v) => json_as_field(v),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty | FieldValue::Json(serde_json::Value::Null))
    }
}

fn format_float(f: f64) -> String {
    if f.is_infinite() {
        let text = if f > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        f.to_string()
    }
}

fn json_as_field(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        // Serializing a Value cannot fail
        Value::Array(_) | Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_field())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::String(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::String(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        FieldValue::Int(i)
    }
}

impl From<i32> for FieldValue {
    fn from(i: i32) -> Self {
        FieldValue::Int(i64::from(i))
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(d: DateTime<Utc>) -> Self {
        FieldValue::DateTime(d)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(FieldValue::Empty)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => FieldValue::Empty,
            serde_json::Value::String(s) => FieldValue::String(s),
            serde_json::Value::Bool(b) => FieldValue::Bool(b),
            other => FieldValue::Json(other),
        }
    }
}
