//! CSV generation: rows and keyed objects to text
//!
//! The output always parses back to the input: fields are quoted exactly when
//! the parser would otherwise split or alter them.

use crate::csv::CsvEncoder;
use crate::error::{CsvError, Result};
use crate::options::GenerateOptions;
use crate::types::FieldValue;
use indexmap::IndexMap;

/// A keyed row for object generation; key order is preserved
pub type ObjectRow = IndexMap<String, FieldValue>;

fn encoder(options: &GenerateOptions) -> CsvEncoder {
    CsvEncoder::new(options.delimiter, options.always_quote)
}

/// Generate one line (no line ending) from a row of fields
pub fn generate_row<S: AsRef<str>>(fields: &[S], options: &GenerateOptions) -> String {
    let mut line = String::new();
    encoder(options).encode_row(fields, &mut line);
    line
}

/// Generate CSV text from rows
///
/// Rows are joined with the configured line ending, without a trailing one.
/// An empty row set gives an empty string.
///
/// The output parses back to `rows` when the parser is given the same
/// delimiter explicitly. Delimiter auto-detection only looks at unquoted
/// text, so it can pick a character that appears inside fields: with the
/// default comma, `[["a;b", "c;d"]]` becomes `a;b,c;d`, which detects as
/// semicolon-separated and parses to `[["a", "b,c", "d"]]`.
///
/// # Examples
///
/// ```
/// use streamcsv::{generate, GenerateOptions};
///
/// let csv = generate(&[vec!["name", "note"], vec!["Alice", "says \"hi\""]], &GenerateOptions::default());
/// assert_eq!(csv, "name,note\nAlice,\"says \"\"hi\"\"\"");
/// ```
pub fn generate<R, S>(rows: &[R], options: &GenerateOptions) -> String
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let encoder = encoder(options);
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            out.push_str(options.line_ending.as_str());
        }
        encoder.encode_row(row.as_ref(), &mut out);
    }
    out
}

/// Generate CSV text from keyed objects
///
/// Headers come from `options.columns` or the first object's keys. Missing
/// keys become empty fields. The header line is omitted when
/// `include_headers` is false.
pub fn generate_from_objects(objects: &[ObjectRow], options: &GenerateOptions) -> String {
    let headers: Vec<String> = match &options.columns {
        Some(columns) => columns.clone(),
        None => match objects.first() {
            Some(first) => first.keys().cloned().collect(),
            None => return String::new(),
        },
    };

    let mut lines: Vec<Vec<String>> = Vec::with_capacity(objects.len() + 1);
    if options.include_headers {
        lines.push(headers.clone());
    }
    for object in objects {
        lines.push(
            headers
                .iter()
                .map(|h| object.get(h).map(FieldValue::as_field).unwrap_or_default())
                .collect(),
        );
    }
    generate(&lines, options)
}

/// Generate CSV text from JSON objects
///
/// Every value must be a JSON object; nested arrays and objects are written
/// as JSON text.
pub fn generate_from_json(values: &[serde_json::Value], options: &GenerateOptions) -> Result<String> {
    let objects = values
        .iter()
        .enumerate()
        .map(|(i, value)| match value {
            serde_json::Value::Object(map) => Ok(map
                .iter()
                .map(|(k, v)| (k.clone(), FieldValue::from(v.clone())))
                .collect::<ObjectRow>()),
            _ => Err(CsvError::InvalidOption(format!(
                "item {} is not a JSON object",
                i
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(generate_from_objects(&objects, options))
}

/// Incremental CSV builder
///
/// Accumulates encoded rows; render them all at once with
/// [`CsvBuilder::build`] or pull them one at a time with [`CsvBuilder::rows`].
///
/// # Examples
///
/// ```
/// use streamcsv::{CsvBuilder, GenerateOptions, LineEnding};
///
/// let mut builder = CsvBuilder::new(GenerateOptions::new().line_ending(LineEnding::CrLf));
/// builder.add_row(&["id", "name"]).add_row(&["1", "Alice"]);
///
/// let rows: Vec<String> = builder.rows().collect();
/// assert_eq!(rows, vec!["id,name\r\n", "1,Alice"]);
/// assert_eq!(builder.build(), "id,name\r\n1,Alice");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvBuilder {
    options: GenerateOptions,
    lines: Vec<String>,
}

impl CsvBuilder {
    pub fn new(options: GenerateOptions) -> Self {
        Self {
            options,
            lines: Vec::new(),
        }
    }

    /// Add a header row
    pub fn with_headers<S: AsRef<str>>(&mut self, headers: &[S]) -> &mut Self {
        self.add_row(headers)
    }

    /// Add a row of fields
    pub fn add_row<S: AsRef<str>>(&mut self, fields: &[S]) -> &mut Self {
        self.lines.push(generate_row(fields, &self.options));
        self
    }

    /// Add many rows
    pub fn add_rows<R, S>(&mut self, rows: &[R]) -> &mut Self
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        for row in rows {
            self.add_row(row.as_ref());
        }
        self
    }

    /// Add a row of typed values
    pub fn add_values(&mut self, values: &[FieldValue]) -> &mut Self {
        let fields: Vec<String> = values.iter().map(FieldValue::as_field).collect();
        self.add_row(fields.as_slice())
    }

    /// Number of rows added
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Render all rows as one string
    pub fn build(&self) -> String {
        self.lines.join(self.options.line_ending.as_str())
    }

    /// Snapshot iterator yielding one row at a time
    ///
    /// Every row but the last carries the line ending. Rows added after this
    /// call are not seen by the iterator.
    pub fn rows(&self) -> BuilderRows {
        BuilderRows {
            lines: self.lines.clone().into_iter().peekable(),
            line_ending: self.options.line_ending.as_str(),
        }
    }

    /// Snapshot iterator yielding groups of `rows_per_chunk` rows as text
    ///
    /// Concatenating the chunks gives the same text as [`CsvBuilder::build`].
    pub fn chunks(&self, rows_per_chunk: usize) -> BuilderChunks {
        BuilderChunks {
            rows: self.rows(),
            rows_per_chunk: rows_per_chunk.max(1),
        }
    }
}

/// Pull-based row sequence from a [`CsvBuilder`] snapshot
#[derive(Debug)]
pub struct BuilderRows {
    lines: std::iter::Peekable<std::vec::IntoIter<String>>,
    line_ending: &'static str,
}

impl Iterator for BuilderRows {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut line = self.lines.next()?;
        if self.lines.peek().is_some() {
            line.push_str(self.line_ending);
        }
        Some(line)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.lines.size_hint()
    }
}

/// Chunked text sequence from a [`CsvBuilder`] snapshot
#[derive(Debug)]
pub struct BuilderChunks {
    rows: BuilderRows,
    rows_per_chunk: usize,
}

impl Iterator for BuilderChunks {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let mut chunk = self.rows.next()?;
        for row in self.rows.by_ref().take(self.rows_per_chunk - 1) {
            chunk.push_str(&row);
        }
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{LineEnding, ParseOptions};
    use crate::types::Delimiter;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_generate_rows() {
        let opts = GenerateOptions::default();
        assert_eq!(
            generate(&[vec!["a", "b"], vec!["1", "2"]], &opts),
            "a,b\n1,2"
        );
        assert_eq!(generate::<Vec<&str>, &str>(&[], &opts), "");
        assert_eq!(
            generate(&[vec!["x;y", "z"]], &opts.clone().delimiter(Delimiter::SEMICOLON)),
            "\"x;y\";z"
        );
        assert_eq!(
            generate(
                &[vec!["a"], vec!["b"]],
                &GenerateOptions::new().line_ending(LineEnding::CrLf)
            ),
            "a\r\nb"
        );
    }

    #[test]
    fn test_roundtrip_needs_explicit_delimiter() {
        let rows = [vec!["a;b", "c;d"]];
        let csv = generate(&rows, &GenerateOptions::default());
        assert_eq!(csv, "a;b,c;d");

        let comma = ParseOptions::new().delimiter(Delimiter::COMMA);
        let explicit = crate::parse(&csv, &comma).unwrap();
        assert_eq!(explicit.rows[0].fields, rows[0]);

        let detected = crate::parse(&csv, &ParseOptions::default()).unwrap();
        assert_eq!(detected.delimiter, Delimiter::SEMICOLON);
        assert_eq!(detected.rows[0].fields, vec!["a", "b,c", "d"]);
    }

    #[test]
    fn test_always_quote() {
        let opts = GenerateOptions::new().always_quote(true);
        assert_eq!(generate_row(&["a", "b\"c"], &opts), r#""a","b""c""#);
    }

    #[test]
    fn test_generate_from_objects() {
        let mut first = ObjectRow::new();
        first.insert("name".into(), "Alice".into());
        first.insert("age".into(), FieldValue::Int(30));
        first.insert("joined".into(), Utc.with_ymd_and_hms(2020, 5, 1, 0, 0, 0).unwrap().into());

        let mut second = ObjectRow::new();
        second.insert("age".into(), FieldValue::Empty);
        second.insert("name".into(), "Bob, Jr.".into());

        let csv = generate_from_objects(&[first.clone(), second.clone()], &GenerateOptions::default());
        assert_eq!(
            csv,
            "name,age,joined\nAlice,30,2020-05-01T00:00:00.000Z\n\"Bob, Jr.\",,"
        );

        let csv = generate_from_objects(
            &[first, second],
            &GenerateOptions::new().columns(["age", "name"]).include_headers(false),
        );
        assert_eq!(csv, "30,Alice\n,\"Bob, Jr.\"");

        assert_eq!(generate_from_objects(&[], &GenerateOptions::default()), "");
    }

    #[test]
    fn test_generate_from_json() {
        let values = vec![
            json!({"id": 1, "tags": ["a", "b"], "ok": true, "note": null}),
            json!({"id": 2, "meta": {"k": "v"}}),
        ];
        let csv = generate_from_json(&values, &GenerateOptions::default()).unwrap();
        assert_eq!(
            csv,
            "id,tags,ok,note\n1,\"[\"\"a\"\",\"\"b\"\"]\",true,\n2,,,"
        );

        assert!(generate_from_json(&[json!(1)], &GenerateOptions::default()).is_err());
    }

    #[test]
    fn test_builder_rows_snapshot() {
        let mut builder = CsvBuilder::new(GenerateOptions::default());
        builder.with_headers(&["id", "v"]).add_rows(&[vec!["1", "x"], vec!["2", "y"]]);

        let snapshot = builder.rows();
        builder.add_values(&[FieldValue::Int(3), FieldValue::Bool(false)]);

        let rows: Vec<String> = snapshot.collect();
        assert_eq!(rows, vec!["id,v\n", "1,x\n", "2,y"]);
        assert_eq!(builder.len(), 4);
        assert_eq!(builder.build(), "id,v\n1,x\n2,y\n3,false");
    }

    #[test]
    fn test_builder_chunks() {
        let mut builder = CsvBuilder::new(GenerateOptions::default());
        for i in 0..5 {
            builder.add_row(&[i.to_string()]);
        }
        let chunks: Vec<String> = builder.chunks(2).collect();
        assert_eq!(chunks, vec!["0\n1\n", "2\n3\n", "4"]);
        assert_eq!(chunks.concat(), builder.build());

        builder.clear();
        assert!(builder.is_empty());
        assert_eq!(builder.build(), "");
        assert_eq!(builder.rows().count(), 0);
    }
}
