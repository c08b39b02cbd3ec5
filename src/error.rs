//! Error types for CSV parsing and generation

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, CsvError>;

/// Errors raised by the CSV codec
#[derive(Debug, Error)]
pub enum CsvError {
    /// Options were rejected before any parsing began
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Input ended while a quoted field was still open
    ///
    /// `preview` holds at most the first 50 characters of the partial field.
    #[error("Unclosed quoted field: \"{preview}...\"")]
    UnclosedQuote { preview: String },

    /// Streaming residual buffer grew past its configured maximum
    #[error("Buffer size exceeded: {size} bytes buffered, limit is {limit} bytes (raise max_buffer_size or check for an unterminated quoted field)")]
    BufferExceeded { size: usize, limit: usize },

    /// Input bytes could not be decoded as text
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Underlying reader or writer failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An async chunk source yielded an error
    #[error("Source error: {0}")]
    Source(String),

    /// A panic was caught by a non-throwing entry point
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CsvError {
    /// True for the resource-limit class (buffer exceeded)
    pub fn is_resource_limit(&self) -> bool {
        matches!(self, CsvError::BufferExceeded { .. })
    }

    /// True for structural parse errors in the input itself
    pub fn is_malformed_input(&self) -> bool {
        matches!(self, CsvError::UnclosedQuote { .. } | CsvError::Encoding(_))
    }

    pub(crate) fn unclosed_quote(partial: &str) -> Self {
        CsvError::UnclosedQuote {
            preview: partial
                .chars()
                .take(crate::options::ERROR_PREVIEW_CHARS)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unclosed_quote_preview_is_bounded() {
        let long = "x".repeat(10_000);
        let err = CsvError::unclosed_quote(&long);
        let msg = err.to_string();
        assert!(msg.starts_with("Unclosed quoted field"));
        assert!(msg.len() < 100);
        assert!(err.is_malformed_input());
        assert!(!err.is_resource_limit());
    }

    #[test]
    fn test_buffer_exceeded_is_resource_limit() {
        let err = CsvError::BufferExceeded {
            size: 20,
            limit: 10,
        };
        assert!(err.is_resource_limit());
        assert!(!err.is_malformed_input());
        assert!(err.to_string().contains("Buffer size exceeded"));
    }
}
