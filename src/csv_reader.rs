//! Blocking CSV reader over any byte source
//!
//! Pulls fixed-size chunks from a [`std::io::Read`] and drives a
//! [`StreamParser`], so memory stays bounded by the chunk size plus the
//! residual buffer regardless of input size.

use crate::error::{CsvError, Result};
use crate::options::StreamOptions;
use crate::stream::{DocumentCollector, StreamParser, Utf8ChunkDecoder};
use crate::types::{Document, ParsedRow, StreamEvent};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// CSV reader with streaming capabilities
///
/// Reads CSV data event by event using an iterator pattern. A leading UTF-8
/// BOM is stripped.
///
/// # Examples
///
/// ```
/// use streamcsv::{CsvReader, ParseOptions, StreamOptions};
///
/// let data = "id,name\n1,Alice\n2,Bob\n";
/// let options = StreamOptions::new().parse_options(ParseOptions::new().has_headers(true));
/// let mut reader = CsvReader::new(data.as_bytes(), options).unwrap();
///
/// let rows: Vec<_> = reader.rows().collect::<Result<_, _>>().unwrap();
/// assert_eq!(rows.len(), 2);
/// assert_eq!(reader.headers().unwrap(), ["id", "name"]);
/// ```
pub struct CsvReader<R> {
    reader: R,
    parser: StreamParser,
    decoder: Utf8ChunkDecoder,
    chunk: Vec<u8>,
    pending: VecDeque<StreamEvent>,
    done: bool,
}

impl CsvReader<File> {
    /// Open a CSV file for streaming read
    pub fn open<P: AsRef<Path>>(path: P, options: StreamOptions) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| {
            CsvError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open CSV file {}: {}", path.as_ref().display(), e),
            ))
        })?;
        Self::new(file, options)
    }
}

impl<R: Read> CsvReader<R> {
    /// Create a reader over any byte source
    pub fn new(reader: R, options: StreamOptions) -> Result<Self> {
        let chunk = vec![0u8; options.chunk_size];
        let parser = StreamParser::new(options)?;
        Ok(CsvReader {
            reader,
            parser,
            decoder: Utf8ChunkDecoder::new(),
            chunk,
            pending: VecDeque::new(),
            done: false,
        })
    }

    /// Get header row if known yet
    pub fn headers(&self) -> Option<&[String]> {
        self.parser.headers()
    }

    /// Get the number of data rows read so far
    pub fn row_count(&self) -> usize {
        self.parser.rows_emitted()
    }

    /// Read the next event
    ///
    /// Returns `Ok(None)` after the `Complete` event has been returned.
    pub fn next_event(&mut self) -> Result<Option<StreamEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }
            if self.done {
                return Ok(None);
            }
            if let Err(e) = self.fill() {
                self.done = true;
                return Err(e);
            }
        }
    }

    // Read one chunk and queue the events it resolves
    fn fill(&mut self) -> Result<()> {
        let n = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 {
            self.decoder.finish()?;
            self.pending.extend(self.parser.finish()?);
            self.done = true;
        } else {
            let text = self.decoder.decode(&self.chunk[..n])?;
            self.pending.extend(self.parser.feed(&text)?);
        }
        Ok(())
    }

    /// Get iterator over events
    pub fn events(&mut self) -> CsvEventIterator<'_, R> {
        CsvEventIterator { reader: self }
    }

    /// Get iterator over data rows only
    pub fn rows(&mut self) -> CsvRowIterator<'_, R> {
        CsvRowIterator { reader: self }
    }

    /// Read everything into a document
    pub fn into_document(mut self) -> Result<Document> {
        let mut collector = DocumentCollector::new();
        while let Some(event) = self.next_event()? {
            collector.push(event);
        }
        Ok(collector.into_document())
    }
}

/// Iterator over CSV events
pub struct CsvEventIterator<'a, R> {
    reader: &'a mut CsvReader<R>,
}

impl<'a, R: Read> Iterator for CsvEventIterator<'a, R> {
    type Item = Result<StreamEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_event().transpose()
    }
}

/// Iterator over data rows
pub struct CsvRowIterator<'a, R> {
    reader: &'a mut CsvReader<R>,
}

impl<'a, R: Read> Iterator for CsvRowIterator<'a, R> {
    type Item = Result<ParsedRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.reader.next_event() {
                Ok(Some(StreamEvent::Row(row))) => return Some(Ok(row)),
                Ok(Some(_)) => continue,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
