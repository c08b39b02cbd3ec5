//! Parser, streaming and generator options
//!
//! All option structs are plain values with `Default` impls and builder-style
//! setters. Nothing here is global or shared.

use crate::error::{CsvError, Result};
use crate::types::Delimiter;

/// Default ceiling for the streaming residual buffer (10 MiB)
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10 * 1024 * 1024;

/// Default read size for byte sources (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Number of non-empty lines sampled for delimiter detection
pub const DETECTION_SAMPLE_LINES: usize = 10;

/// Characters of a partial field shown in an unclosed-quote error
pub const ERROR_PREVIEW_CHARS: usize = 50;

/// Delimiters considered by auto-detection, in tie-break order
pub const CANDIDATE_DELIMITERS: [char; 4] = [',', ';', '|', '\t'];

/// Header names that are never turned into record keys
pub const RESERVED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Options for the full-buffer parser
///
/// # Examples
///
/// ```
/// use streamcsv::{ParseOptions, Delimiter};
///
/// let opts = ParseOptions::new()
///     .delimiter(Delimiter::SEMICOLON)
///     .has_headers(true)
///     .trim_fields(true);
/// assert!(opts.has_headers);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParseOptions {
    /// Field delimiter; `None` means auto-detect
    pub delimiter: Option<Delimiter>,
    /// Rows dropped before header/data handling
    pub skip_rows: usize,
    /// Treat the first retained row as headers
    pub has_headers: bool,
    /// Trim whitespace around headers and fields
    pub trim_fields: bool,
    /// Explicit header names, used only when `has_headers` is false
    pub columns: Option<Vec<String>>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fixed delimiter (builder pattern)
    pub fn delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    /// Set the delimiter from a host-supplied string
    ///
    /// Fails with [`CsvError::InvalidOption`] unless the string is exactly one
    /// usable character.
    pub fn delimiter_str(mut self, delimiter: &str) -> Result<Self> {
        self.delimiter = Some(Delimiter::try_from(delimiter)?);
        Ok(self)
    }

    pub fn skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    /// Set the skip count from a signed value, rejecting negatives
    pub fn skip_rows_signed(mut self, rows: i64) -> Result<Self> {
        self.skip_rows = usize::try_from(rows).map_err(|_| {
            CsvError::InvalidOption(format!("skip_rows must be non-negative, got {}", rows))
        })?;
        Ok(self)
    }

    pub fn has_headers(mut self, has: bool) -> Self {
        self.has_headers = has;
        self
    }

    pub fn trim_fields(mut self, trim: bool) -> Self {
        self.trim_fields = trim;
        self
    }

    /// Supply header names explicitly
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Check options before parsing starts
    pub fn validate(&self) -> Result<()> {
        if let Some(delimiter) = self.delimiter {
            Delimiter::try_from(delimiter.as_char())?;
        }
        Ok(())
    }
}

/// Options for the streaming drivers
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamOptions {
    /// Parsing behaviour shared with the full-buffer parser
    pub parse: ParseOptions,
    /// Bytes requested per read from a blocking byte source
    ///
    /// This is the source-side read size of [`crate::CsvReader`]; it never
    /// changes which events are produced. Output-side chunking of generated
    /// text is [`crate::CsvBuilder::chunks`].
    pub chunk_size: usize,
    /// Maximum residual buffer size in bytes before the session fails
    pub max_buffer_size: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            parse: ParseOptions::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }

    /// Set the read size used by [`crate::CsvReader`]
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    pub fn max_buffer_size(mut self, size: usize) -> Self {
        self.max_buffer_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.parse.validate()?;
        if self.chunk_size == 0 {
            return Err(CsvError::InvalidOption(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_buffer_size == 0 {
            return Err(CsvError::InvalidOption(
                "max_buffer_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl From<ParseOptions> for StreamOptions {
    fn from(parse: ParseOptions) -> Self {
        Self {
            parse,
            ..Self::default()
        }
    }
}

/// Line terminator used by the generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// Options for CSV generation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GenerateOptions {
    pub delimiter: Delimiter,
    pub line_ending: LineEnding,
    /// Emit a header row for keyed-object input
    pub include_headers: bool,
    /// Quote every field, not only those that need it
    pub always_quote: bool,
    /// Explicit header order for keyed-object input
    pub columns: Option<Vec<String>>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::COMMA,
            line_ending: LineEnding::Lf,
            include_headers: true,
            always_quote: false,
            columns: None,
        }
    }
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn include_headers(mut self, include: bool) -> Self {
        self.include_headers = include;
        self
    }

    pub fn always_quote(mut self, always: bool) -> Self {
        self.always_quote = always;
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}
