//! Incremental CSV parsing over chunked input
//!
//! [`StreamParser`] is a sans-I/O session: feed it text chunks in order and it
//! returns the structural events each chunk resolves. Every driver (blocking
//! reader, async byte/text streams, batch) is a thin loop around it.
//!
//! **Memory:**
//! - Only the residual text of the row straddling the last chunk boundary is
//!   retained between chunks
//! - The residual is capped by `max_buffer_size` (default 10 MiB); crossing
//!   it fails the session with [`CsvError::BufferExceeded`]

use crate::csv::detect::{detect_delimiter, SampleProgress, UTF8_BOM};
use crate::csv::parser::trim_row;
use crate::csv::state_machine::{ParserContext, Step};
use crate::error::{CsvError, Result};
use crate::options::{ParseOptions, StreamOptions};
use crate::types::{is_blank_row, Delimiter, Document, ParsedRow, StreamEvent};

/// Streaming parse session
///
/// # Examples
///
/// ```
/// use streamcsv::{StreamParser, StreamOptions, StreamEvent};
///
/// let mut parser = StreamParser::new(StreamOptions::default()).unwrap();
/// let mut events = parser.feed("a,b\n1,\"multi").unwrap();
/// events.extend(parser.feed("line\"\n").unwrap());
/// events.extend(parser.finish().unwrap());
///
/// assert_eq!(events.len(), 3);
/// assert!(matches!(events[2], StreamEvent::Complete { total_rows: 2, .. }));
/// ```
#[derive(Debug)]
pub struct StreamParser {
    options: ParseOptions,
    max_buffer_size: usize,

    // Automaton, created once the delimiter is known
    ctx: Option<ParserContext>,
    // Residual text since the last completed row
    buffer: String,
    // Byte offset in `buffer` where scanning resumes
    scan_pos: usize,
    // Line count toward the detection sample, while the delimiter is unknown
    sample: SampleProgress,

    headers: Option<Vec<String>>,
    announce_columns: bool,
    skipped: usize,
    row_index: usize,
    finished: bool,
}

impl StreamParser {
    /// Start a new session, validating options first
    pub fn new(options: StreamOptions) -> Result<Self> {
        options.validate()?;
        let parse = options.parse;

        // Explicit columns apply only without a header row
        let (headers, announce_columns) = match (&parse.columns, parse.has_headers) {
            (Some(columns), false) => (Some(columns.clone()), true),
            _ => (None, false),
        };

        let ctx = parse.delimiter.map(ParserContext::new);
        Ok(Self {
            options: parse,
            max_buffer_size: options.max_buffer_size,
            ctx,
            buffer: String::new(),
            scan_pos: 0,
            sample: SampleProgress::default(),
            headers,
            announce_columns,
            skipped: 0,
            row_index: 0,
            finished: false,
        })
    }

    /// Delimiter in use, once fixed or detected
    pub fn delimiter(&self) -> Option<Delimiter> {
        self.ctx
            .as_ref()
            .and_then(|c| Delimiter::try_from(c.delimiter()).ok())
    }

    /// Headers, once known
    pub fn headers(&self) -> Option<&[String]> {
        self.headers.as_deref()
    }

    /// Bytes currently held in the residual buffer
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Data rows emitted so far
    pub fn rows_emitted(&self) -> usize {
        self.row_index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed the next chunk of text
    ///
    /// Returns the events resolved by this chunk (possibly none).
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<StreamEvent>> {
        self.ensure_open()?;
        self.buffer.push_str(chunk);
        if self.buffer.len() > self.max_buffer_size {
            tracing::warn!(
                size = self.buffer.len(),
                limit = self.max_buffer_size,
                "residual buffer exceeded"
            );
            self.finished = true;
            return Err(CsvError::BufferExceeded {
                size: self.buffer.len(),
                limit: self.max_buffer_size,
            });
        }
        tracing::trace!(chunk = chunk.len(), buffered = self.buffer.len(), "chunk received");

        let mut events = Vec::new();
        if self.ctx.is_none() {
            // Wait for a stable detection sample
            if !self.sample.advance(&self.buffer) {
                return Ok(events);
            }
            self.start(detect_delimiter(&self.buffer));
        }
        self.scan(false, &mut events);
        Ok(events)
    }

    /// Signal end of input
    ///
    /// Fails if the input ended inside a quoted field. Otherwise emits the
    /// final unterminated row (if any) and the `Complete` event.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>> {
        self.ensure_open()?;
        self.finished = true;

        if self.ctx.is_none() {
            self.start(detect_delimiter(&self.buffer));
        }

        let mut events = Vec::new();
        self.scan(true, &mut events);

        let pending = match self.ctx.as_mut() {
            Some(ctx) => ctx.flush()?,
            None => None,
        };
        if let Some(fields) = pending {
            self.handle_row(fields, &mut events);
        }
        self.buffer.clear();
        self.scan_pos = 0;
        self.announce(&mut events);

        let delimiter = self.delimiter().unwrap_or_default();
        tracing::debug!(rows = self.row_index, delimiter = ?delimiter.as_char(), "stream complete");
        events.push(StreamEvent::Complete {
            total_rows: self.row_index,
            delimiter,
        });
        Ok(events)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.finished {
            return Err(CsvError::InvalidOption(
                "stream session already finished".to_string(),
            ));
        }
        Ok(())
    }

    fn start(&mut self, delimiter: Delimiter) {
        tracing::debug!(delimiter = ?delimiter.as_char(), "stream session started");
        self.ctx = Some(ParserContext::new(delimiter));
    }

    // Drive the automaton over unscanned text, then drop everything up to the
    // end of the last completed row
    fn scan(&mut self, at_end: bool, events: &mut Vec<StreamEvent>) {
        let Some(ctx) = self.ctx.as_mut() else {
            return;
        };

        let mut rows = Vec::new();
        let mut safe = 0;
        let mut resume = self.buffer.len();

        let tail = &self.buffer[self.scan_pos..];
        let mut chars = tail.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            let offset = self.scan_pos + i;
            let next = chars.peek().map(|&(_, c)| c);

            // A trailing CR outside quotes needs the next chunk to resolve
            if ch == '\r' && next.is_none() && !at_end && !ctx.in_quoted_field() {
                resume = offset;
                break;
            }

            if let Step::Row { fields, skip_next } = ctx.process_char(ch, next) {
                let mut end = offset + ch.len_utf8();
                if skip_next {
                    chars.next();
                    end += 1;
                }
                safe = end;
                rows.push(fields);
            }
        }

        self.buffer.drain(..safe);
        self.scan_pos = resume - safe;

        for fields in rows {
            self.handle_row(fields, events);
        }
    }

    fn handle_row(&mut self, fields: Vec<String>, events: &mut Vec<StreamEvent>) {
        if is_blank_row(&fields) {
            return;
        }
        if self.options.has_headers && self.headers.is_none() {
            let headers = trim_row(fields, self.options.trim_fields);
            self.headers = Some(headers.clone());
            events.push(StreamEvent::Headers(headers));
            return;
        }
        if self.skipped < self.options.skip_rows {
            self.skipped += 1;
            return;
        }

        self.announce(events);
        let row = ParsedRow::new(
            trim_row(fields, self.options.trim_fields),
            self.row_index,
            self.headers.as_deref(),
        );
        self.row_index += 1;
        events.push(StreamEvent::Row(row));
    }

    // Emit explicit columns once, ahead of the first row
    fn announce(&mut self, events: &mut Vec<StreamEvent>) {
        if self.announce_columns {
            self.announce_columns = false;
            if let Some(headers) = &self.headers {
                events.push(StreamEvent::Headers(headers.clone()));
            }
        }
    }
}

/// Parse an in-memory sequence of text chunks into a document
pub fn parse_chunks<I, S>(chunks: I, options: StreamOptions) -> Result<Document>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = StreamParser::new(options)?;
    let mut collector = DocumentCollector::new();
    for chunk in chunks {
        collector.extend(parser.feed(chunk.as_ref())?);
    }
    collector.extend(parser.finish()?);
    Ok(collector.into_document())
}

/// Folds stream events into a [`Document`]
#[derive(Debug, Default)]
pub struct DocumentCollector {
    headers: Option<Vec<String>>,
    rows: Vec<ParsedRow>,
    delimiter: Option<Delimiter>,
    total_rows: usize,
}

impl DocumentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Headers(headers) => self.headers = Some(headers),
            StreamEvent::Row(row) => self.rows.push(row),
            StreamEvent::Complete {
                total_rows,
                delimiter,
            } => {
                self.total_rows = total_rows;
                self.delimiter = Some(delimiter);
            }
        }
    }

    pub fn extend<I: IntoIterator<Item = StreamEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    pub fn into_document(self) -> Document {
        Document {
            headers: self.headers,
            total_rows: self.total_rows.max(self.rows.len()),
            rows: self.rows,
            delimiter: self.delimiter.unwrap_or_default(),
        }
    }
}

/// Decodes UTF-8 byte chunks whose boundaries may split a character
///
/// A leading UTF-8 BOM is stripped.
#[derive(Debug, Default)]
pub struct Utf8ChunkDecoder {
    pending: Vec<u8>,
    started: bool,
}

impl Utf8ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of the accumulated bytes as forms complete characters
    pub fn decode(&mut self, chunk: &[u8]) -> Result<String> {
        self.pending.extend_from_slice(chunk);

        if !self.started {
            if self.pending.len() < UTF8_BOM.len() && UTF8_BOM.starts_with(&self.pending) {
                return Ok(String::new());
            }
            self.started = true;
            if self.pending.starts_with(UTF8_BOM) {
                self.pending.drain(..UTF8_BOM.len());
            }
        }

        let valid = match std::str::from_utf8(&self.pending) {
            Ok(_) => self.pending.len(),
            // Incomplete sequence at the end: keep it for the next chunk
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(e) => return Err(CsvError::Encoding(format!("Invalid UTF-8: {}", e))),
        };

        let decoded: Vec<u8> = self.pending.drain(..valid).collect();
        String::from_utf8(decoded).map_err(|e| CsvError::Encoding(format!("Invalid UTF-8: {}", e)))
    }

    /// Check that no partial character is left at end of input
    pub fn finish(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(CsvError::Encoding(format!(
                "Truncated UTF-8 sequence at end of input ({} bytes)",
                self.pending.len()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::parser::CsvParser;

    fn stream(chunks: &[&str], options: StreamOptions) -> Result<Document> {
        parse_chunks(chunks.iter(), options)
    }

    fn full(content: &str, options: ParseOptions) -> Document {
        CsvParser::new(options).parse(content).unwrap()
    }

    #[test]
    fn test_events_in_order() {
        let mut parser =
            StreamParser::new(StreamOptions::new().parse_options(ParseOptions::new().has_headers(true)))
                .unwrap();
        let mut events = parser.feed("id,name\n1,Al").unwrap();
        assert_eq!(events.len(), 0, "delimiter detection waits for a full sample");
        events.extend(parser.feed("ice\n2,Bob").unwrap());
        events.extend(parser.finish().unwrap());

        assert_eq!(
            events[0],
            StreamEvent::Headers(vec!["id".to_string(), "name".to_string()])
        );
        match &events[1] {
            StreamEvent::Row(row) => {
                assert_eq!(row.fields, vec!["1", "Alice"]);
                assert_eq!(row.get_by_name("name"), Some("Alice"));
                assert_eq!(row.row_index, 0);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            events[3],
            StreamEvent::Complete {
                total_rows: 2,
                delimiter: Delimiter::COMMA
            }
        );
    }

    #[test]
    fn test_rows_emitted_per_chunk_with_fixed_delimiter() {
        let opts = StreamOptions::new().parse_options(ParseOptions::new().delimiter(Delimiter::COMMA));
        let mut parser = StreamParser::new(opts).unwrap();
        assert_eq!(parser.feed("a,b\nc,").unwrap().len(), 1);
        assert_eq!(parser.buffered_len(), 2);
        assert_eq!(parser.feed("d\n").unwrap().len(), 1);
        assert_eq!(parser.buffered_len(), 0);
    }

    fn comma() -> ParseOptions {
        ParseOptions::new().delimiter(Delimiter::COMMA)
    }

    #[test]
    fn test_split_everywhere_matches_full_parse() {
        let input = "name,quote\r\n\"Smith, J\",\"say \"\"hi\"\"\"\n\n\"multi\r\nline\",x\r\nlast,\"\"";
        let expected = full(input, comma());
        assert_eq!(expected.total_rows, 4);
        for split in 0..=input.len() {
            if !input.is_char_boundary(split) {
                continue;
            }
            let (a, b) = input.split_at(split);
            let doc = stream(&[a, b], StreamOptions::new().parse_options(comma())).unwrap();
            assert_eq!(doc, expected, "split at {}", split);
        }
    }

    #[test]
    fn test_single_char_chunks_with_detection() {
        let mut input = String::from("a;b;c\n");
        for i in 0..12 {
            input.push_str(&format!("{};\"x;\r\n\"\"y\";z\r\n", i));
        }
        let chunks: Vec<String> = input.chars().map(|c| c.to_string()).collect();

        let mut parser = StreamParser::new(StreamOptions::new()).unwrap();
        let mut collector = DocumentCollector::new();
        let mut emitted_before_end = 0;
        for chunk in &chunks {
            let events = parser.feed(chunk).unwrap();
            emitted_before_end += events.len();
            collector.extend(events);
        }
        collector.extend(parser.finish().unwrap());
        let doc = collector.into_document();

        assert!(emitted_before_end > 0);
        assert_eq!(doc, full(&input, ParseOptions::new()));
        assert_eq!(doc.delimiter, Delimiter::SEMICOLON);
        assert_eq!(doc.rows[1].fields, vec!["0", "x;\r\n\"y", "z"]);
    }

    #[test]
    fn test_detection_wait_is_linear_in_input() {
        let mut parser = StreamParser::new(StreamOptions::new()).unwrap();
        let chunk = "x".repeat(256);
        for _ in 0..2048 {
            assert!(parser.feed(&chunk).unwrap().is_empty());
        }
        // each appended byte is looked at once while waiting for a sample
        assert_eq!(parser.sample.examined, 256 * 2048);
        assert!(parser.delimiter().is_none());

        let doc = {
            let mut collector = DocumentCollector::new();
            collector.extend(parser.finish().unwrap());
            collector.into_document()
        };
        assert_eq!(doc.total_rows, 1);
        assert_eq!(doc.rows[0].fields[0].len(), 256 * 2048);
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut parser = StreamParser::new(StreamOptions::new().parse_options(comma())).unwrap();
        assert!(parser.feed("a,b\r").unwrap().is_empty());
        assert_eq!(parser.feed("\nc,d\r").unwrap().len(), 1);
        assert_eq!(parser.feed("\n").unwrap().len(), 1);
        let events = parser.finish().unwrap();
        assert!(matches!(events[0], StreamEvent::Complete { total_rows: 2, .. }));
    }

    #[test]
    fn test_trailing_cr_at_end_is_data() {
        let doc = stream(&["a,b\r"], StreamOptions::new().parse_options(comma())).unwrap();
        assert_eq!(doc, full("a,b\r", comma()));
        assert_eq!(doc.rows[0].fields, vec!["a", "b\r"]);
    }

    #[test]
    fn test_header_then_skip_rows() {
        let opts = StreamOptions::new()
            .parse_options(ParseOptions::new().has_headers(true).skip_rows(1));
        let doc = stream(&["h1,h2\nskip,me\n1,2\n"], opts).unwrap();
        assert_eq!(doc.headers, Some(vec!["h1".to_string(), "h2".to_string()]));
        assert_eq!(doc.to_rows(), vec![vec!["1", "2"]]);
        assert_eq!(doc.total_rows, 1);
    }

    #[test]
    fn test_explicit_columns_announced() {
        let opts = StreamOptions::new().parse_options(ParseOptions::new().columns(["x", "y"]));
        let mut parser = StreamParser::new(opts).unwrap();
        let events = parser.finish().unwrap();
        assert_eq!(
            events,
            vec![
                StreamEvent::Headers(vec!["x".to_string(), "y".to_string()]),
                StreamEvent::Complete {
                    total_rows: 0,
                    delimiter: Delimiter::COMMA
                }
            ]
        );
    }

    #[test]
    fn test_buffer_exceeded() {
        let opts = StreamOptions::new().max_buffer_size(64);
        let mut parser = StreamParser::new(opts).unwrap();
        parser.feed("a,\"").unwrap();
        let mut result = Ok(Vec::new());
        for _ in 0..100 {
            result = parser.feed("xxxxxxxxxx");
            if result.is_err() {
                break;
            }
        }
        let err = result.unwrap_err();
        assert!(err.is_resource_limit());
        assert!(parser.buffered_len() <= 64 + 10);
        assert!(parser.feed("more").is_err());
    }

    #[test]
    fn test_unclosed_quote_at_end() {
        let err = stream(&["a,b\n", "1,\"open"], StreamOptions::new()).unwrap_err();
        assert!(matches!(err, CsvError::UnclosedQuote { .. }));
        assert!(err.to_string().contains("open"));
    }

    #[test]
    fn test_empty_input() {
        let doc = stream(&[], StreamOptions::new()).unwrap();
        assert!(doc.is_empty());
        assert_eq!(doc.total_rows, 0);
        assert_eq!(doc.delimiter, Delimiter::COMMA);
    }

    #[test]
    fn test_utf8_decoder_split_character() {
        let bytes = "\u{feff}héllo,wörld".as_bytes();
        let mut decoder = Utf8ChunkDecoder::new();
        let mut out = String::new();
        for b in bytes {
            out.push_str(&decoder.decode(std::slice::from_ref(b)).unwrap());
        }
        decoder.finish().unwrap();
        assert_eq!(out, "héllo,wörld");
    }

    #[test]
    fn test_utf8_decoder_errors() {
        let mut decoder = Utf8ChunkDecoder::new();
        assert!(decoder.decode(&[b'a', 0xFF, b'b']).is_err());

        let mut decoder = Utf8ChunkDecoder::new();
        assert_eq!(decoder.decode(&[b'a', 0xC3]).unwrap(), "a");
        assert!(decoder.finish().is_err());
    }
}
