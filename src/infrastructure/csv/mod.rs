// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV decoding, tokenizing and header sanitization

mod csv_parser;
pub mod header;

pub use csv_parser::{decode_bytes, split_line, CsvParser, DELIMITER_CANDIDATES};
