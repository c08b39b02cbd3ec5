//! CSV writing with streaming support
//!
//! Encodes rows straight into any [`std::io::Write`] sink, one row at a time,
//! so output size never dictates memory use.

use crate::csv::CsvEncoder;
use crate::error::Result;
use crate::options::GenerateOptions;
use crate::types::FieldValue;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// CSV writer with streaming capabilities
///
/// Rows are separated by the configured line ending; no line ending follows
/// the last row, matching [`crate::generate`].
///
/// # Examples
///
/// ```
/// use streamcsv::{CsvWriter, GenerateOptions};
///
/// let mut writer = CsvWriter::new(Vec::new(), GenerateOptions::default());
/// writer.write_row(["Name", "Age", "City"]).unwrap();
/// writer.write_row(["Alice", "30", "New York, NY"]).unwrap();
/// let bytes = writer.finish().unwrap();
///
/// assert_eq!(bytes, b"Name,Age,City\nAlice,30,\"New York, NY\"");
/// ```
pub struct CsvWriter<W: Write> {
    writer: W,

    // State
    row_count: u64,
    buffer: Vec<u8>,

    // Configuration
    encoder: CsvEncoder,
    line_ending: &'static [u8],
}

impl CsvWriter<BufWriter<File>> {
    /// Create a CSV file and write into it
    pub fn create<P: AsRef<Path>>(path: P, options: GenerateOptions) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file), options))
    }
}

impl<W: Write> CsvWriter<W> {
    /// Create a writer over any sink
    pub fn new(writer: W, options: GenerateOptions) -> Self {
        CsvWriter {
            writer,
            row_count: 0,
            buffer: Vec::with_capacity(4096),
            encoder: CsvEncoder::new(options.delimiter, options.always_quote),
            line_ending: options.line_ending.as_str().as_bytes(),
        }
    }

    /// Write a row of strings
    pub fn write_row<I, S>(&mut self, data: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // Reuse buffer
        self.buffer.clear();
        if self.row_count > 0 {
            self.buffer.extend_from_slice(self.line_ending);
        }

        self.encoder.encode_row_bytes(data, &mut self.buffer);

        self.writer.write_all(&self.buffer)?;
        self.row_count += 1;
        Ok(())
    }

    /// Write a header row
    pub fn write_headers<I, S>(&mut self, headers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.write_row(headers)
    }

    /// Write a row of typed values
    ///
    /// Values are coerced with [`FieldValue::as_field`].
    pub fn write_row_values(&mut self, values: &[FieldValue]) -> Result<()> {
        self.write_row(values.iter().map(FieldValue::as_field))
    }

    /// Write multiple rows at once
    pub fn write_rows_batch<I, R, S>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for row_data in rows {
            self.write_row(row_data)?;
        }
        Ok(())
    }

    /// Get the number of rows written
    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    /// Flush and return the underlying sink
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}
