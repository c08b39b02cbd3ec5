//! CSV utilities for encoding and parsing

pub mod detect;
pub mod encoder;
pub mod parser;
pub mod state_machine;

pub use detect::{decode_bytes, detect_delimiter, detect_encoding, TextEncoding};
pub use encoder::{escape_field, needs_quoting, CsvEncoder};
pub use parser::{parse_line, CsvParser};
pub use state_machine::{ParseState, ParserContext, Step};
