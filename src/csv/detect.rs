//! Delimiter auto-detection and byte-order-mark handling

use crate::error::{CsvError, Result};
use crate::options::{CANDIDATE_DELIMITERS, DETECTION_SAMPLE_LINES};
use crate::types::Delimiter;

pub(crate) const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Text encoding identified from a byte-order mark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

/// Detect the encoding of a byte buffer from its BOM
///
/// Returns the encoding and the BOM length to strip. Buffers without a BOM
/// are treated as UTF-8 with nothing to strip.
pub fn detect_encoding(bytes: &[u8]) -> (TextEncoding, usize) {
    if bytes.starts_with(UTF8_BOM) {
        (TextEncoding::Utf8, UTF8_BOM.len())
    } else if bytes.starts_with(UTF16_LE_BOM) {
        (TextEncoding::Utf16Le, UTF16_LE_BOM.len())
    } else if bytes.starts_with(UTF16_BE_BOM) {
        (TextEncoding::Utf16Be, UTF16_BE_BOM.len())
    } else {
        (TextEncoding::Utf8, 0)
    }
}

/// Strip any BOM and decode the buffer to a string
pub fn decode_bytes(bytes: &[u8]) -> Result<String> {
    let (encoding, bom_len) = detect_encoding(bytes);
    let body = &bytes[bom_len..];

    match encoding {
        TextEncoding::Utf8 => String::from_utf8(body.to_vec())
            .map_err(|e| CsvError::Encoding(format!("Invalid UTF-8: {}", e))),
        TextEncoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
    }
}

fn decode_utf16(body: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String> {
    if body.len() % 2 != 0 {
        return Err(CsvError::Encoding(
            "UTF-16 input has an odd number of bytes".to_string(),
        ));
    }
    let units = body.chunks_exact(2).map(|pair| to_unit([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| CsvError::Encoding(format!("Invalid UTF-16: {}", e)))
}

/// Detect the delimiter of CSV text
///
/// Samples up to ten non-empty lines and picks the candidate (`,` `;` `|` tab)
/// whose per-line count outside quotes is non-zero on the first line and
/// matches it on the most lines. Ties go to the higher count, then to the
/// earlier candidate. Falls back to comma.
pub fn detect_delimiter(sample: &str) -> Delimiter {
    let lines: Vec<&str> = sample_lines(sample).collect();
    if lines.is_empty() {
        return Delimiter::COMMA;
    }

    let mut best: Option<(char, usize, usize)> = None;
    for &candidate in CANDIDATE_DELIMITERS.iter() {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_outside_quotes(line, candidate))
            .collect();
        let first = counts[0];
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().filter(|&&c| c == first).count();

        let better = match best {
            None => true,
            Some((_, best_consistent, best_count)) => {
                (consistent, first) > (best_consistent, best_count)
            }
        };
        if better {
            best = Some((candidate, consistent, first));
        }
    }

    let detected = best
        .and_then(|(ch, _, _)| Delimiter::try_from(ch).ok())
        .unwrap_or(Delimiter::COMMA);
    tracing::debug!(delimiter = ?detected.as_char(), lines = lines.len(), "detected delimiter");
    detected
}

/// True once `buffer` holds enough terminated lines for a stable sample
///
/// A streaming session waits for this (or end of input) before detecting,
/// so its sample is the same one the full parser sees.
pub fn has_complete_sample(buffer: &str) -> bool {
    SampleProgress::default().advance(buffer)
}

/// Incremental form of [`has_complete_sample`] for a growing buffer
///
/// Each call only looks at text appended since the previous call, so a
/// session fed in many small chunks does linear work in total. The buffer
/// must only grow between calls.
#[derive(Debug, Default, Clone)]
pub(crate) struct SampleProgress {
    // Bytes of the buffer already searched for line breaks
    pos: usize,
    // Start of the line not yet terminated
    line_start: usize,
    lines: usize,
    #[cfg(test)]
    pub(crate) examined: usize,
}

impl SampleProgress {
    /// Account for text appended to `buffer`; true once the sample is complete
    pub(crate) fn advance(&mut self, buffer: &str) -> bool {
        let fresh = &buffer[self.pos..];
        #[cfg(test)]
        {
            self.examined += fresh.len();
        }
        for (i, _) in fresh.match_indices('\n') {
            let end = self.pos + i;
            if is_sample_line(&buffer[self.line_start..end]) {
                self.lines += 1;
            }
            self.line_start = end + 1;
            if self.lines >= DETECTION_SAMPLE_LINES {
                break;
            }
        }
        self.pos = buffer.len();
        self.lines >= DETECTION_SAMPLE_LINES
    }
}

fn sample_lines(sample: &str) -> impl Iterator<Item = &str> {
    sample
        .lines()
        .filter(|line| is_sample_line(line))
        .take(DETECTION_SAMPLE_LINES)
}

fn is_sample_line(line: &str) -> bool {
    !line.trim().is_empty()
}

fn count_outside_quotes(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for ch in line.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if ch == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}
