//! # streamcsv
//!
//! RFC 4180 CSV codec built around one resumable state machine.
//!
//! ## Features
//!
//! - **Full parsing**: quoted fields, embedded delimiters and newlines,
//!   escaped quotes, LF and CRLF row endings
//! - **Delimiter auto-detection** over comma, semicolon, pipe and tab
//! - **BOM-aware decoding** of UTF-8, UTF-16LE and UTF-16BE buffers
//! - **Bounded-memory streaming**: chunked input with a capped residual buffer
//! - **Generation** that parses back to its input under the same delimiter
//! - **Async drivers** over `futures` streams, including multi-file batches
//!   (feature `async`, on by default)
//!
//! ## Quick Start
//!
//! ### Parsing
//!
//! ```
//! use streamcsv::{parse, ParseOptions};
//!
//! let doc = parse("name;city\nAlice;\"Paris; FR\"\n", &ParseOptions::new().has_headers(true))?;
//! assert_eq!(doc.delimiter.as_char(), ';');
//! assert_eq!(doc.rows[0].get_by_name("city"), Some("Paris; FR"));
//! # Ok::<(), streamcsv::CsvError>(())
//! ```
//!
//! ### Streaming
//!
//! ```
//! use streamcsv::{StreamEvent, StreamOptions, StreamParser};
//!
//! let mut parser = StreamParser::new(StreamOptions::default())?;
//! let mut events = Vec::new();
//! for chunk in ["a,b\n1,", "2\n3,4"] {
//!     events.extend(parser.feed(chunk)?);
//! }
//! events.extend(parser.finish()?);
//!
//! let rows = events.iter().filter(|e| matches!(e, StreamEvent::Row(_))).count();
//! assert_eq!(rows, 3);
//! assert_eq!(parser.rows_emitted(), 3);
//! # Ok::<(), streamcsv::CsvError>(())
//! ```
//!
//! ### Generating
//!
//! ```
//! use streamcsv::{generate, GenerateOptions};
//!
//! let csv = generate(&[vec!["id", "note"], vec!["1", "a, b"]], &GenerateOptions::default());
//! assert_eq!(csv, "id,note\n1,\"a, b\"");
//! ```

pub mod csv;
pub mod csv_reader;
pub mod csv_writer;
pub mod error;
pub mod generator;
pub mod options;
pub mod stream;
pub mod types;

#[cfg(feature = "async")]
pub mod async_stream;

pub use csv::{
    decode_bytes, detect_delimiter, detect_encoding, escape_field, needs_quoting, parse_line,
    CsvEncoder, CsvParser, ParseState, ParserContext, TextEncoding,
};
pub use csv_reader::{CsvEventIterator, CsvReader, CsvRowIterator};
pub use csv_writer::CsvWriter;
pub use error::{CsvError, Result};
pub use generator::{
    generate, generate_from_json, generate_from_objects, generate_row, BuilderChunks,
    BuilderRows, CsvBuilder, ObjectRow,
};
pub use options::{GenerateOptions, LineEnding, ParseOptions, StreamOptions};
pub use stream::{parse_chunks, DocumentCollector, StreamParser, Utf8ChunkDecoder};
pub use types::{
    BatchEvent, BatchSummary, Delimiter, Document, FieldValue, ParseOutcome, ParsedRow, Record,
    StreamEvent,
};

#[cfg(feature = "async")]
pub use async_stream::{
    collect_byte_stream, collect_text_stream, parse_batch, parse_byte_stream, parse_text_stream,
};

/// Parse complete CSV text
pub fn parse(content: &str, options: &ParseOptions) -> Result<Document> {
    CsvParser::new(options.clone()).parse(content)
}

/// Parse complete CSV text without returning an error
pub fn parse_safe(content: &str, options: &ParseOptions) -> ParseOutcome {
    CsvParser::new(options.clone()).parse_safe(content)
}

/// Decode and parse a byte buffer, honoring any byte order mark
pub fn parse_bytes(bytes: &[u8], options: &ParseOptions) -> Result<Document> {
    CsvParser::new(options.clone()).parse_bytes(bytes)
}

/// Byte-buffer counterpart of [`parse_safe`]
pub fn parse_bytes_safe(bytes: &[u8], options: &ParseOptions) -> ParseOutcome {
    CsvParser::new(options.clone()).parse_bytes_safe(bytes)
}
