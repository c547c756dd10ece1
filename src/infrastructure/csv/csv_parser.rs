// ============================================================
// CSV PARSER
// ============================================================
// Decode CSV bytes and tokenize normalized CSV into records

use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::domain::dataset::Record;
use crate::domain::error::AppError;

/// Delimiters considered by `detect_delimiter`, in tie-break order
pub const DELIMITER_CANDIDATES: [char; 4] = [',', ';', '\t', '|'];

/// CSV parser producing flat records
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter as u8;
        self
    }

    /// Parse CSV content into its header row and records.
    /// Rows whose cells are all empty are dropped.
    pub fn parse_content(&self, content: &str) -> Result<(Vec<String>, Vec<Record>), AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .trim(Trim::All)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            if record.iter().all(|cell| cell.trim().is_empty()) {
                continue;
            }
            rows.push(Record::from_cells(&headers, record.iter()));
        }

        Ok((headers, rows))
    }

    /// Read a file, decoding UTF-8 (BOM aware) with a Windows-1252 fallback
    pub fn read_with_encoding_detection(path: &Path) -> Result<String, AppError> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::IoError(format!("Failed to read file {}: {}", path.display(), e))
        })?;
        Ok(decode_bytes(&bytes))
    }

    /// Detect the delimiter from the first line only, ignoring quoted sections.
    /// The most frequent candidate wins; ties and no hits fall back to comma.
    pub fn detect_delimiter(first_line: &str) -> char {
        let mut best_delimiter = ',';
        let mut best_count = 0usize;

        for &candidate in &DELIMITER_CANDIDATES {
            let count = count_unquoted(first_line, candidate);
            if count > best_count {
                best_count = count;
                best_delimiter = candidate;
            }
        }

        best_delimiter
    }
}

/// Decode raw bytes as UTF-8, falling back to Windows-1252
pub fn decode_bytes(bytes: &[u8]) -> String {
    let (text, _, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }
    tracing::debug!("CSV content is not valid UTF-8, decoding as Windows-1252");
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Split a single line on `delimiter`, handling quoted fields and `""` escapes.
/// Quote characters are not part of the returned tokens.
pub fn split_line(line: &str, delimiter: char) -> Vec<String> {
    let mut result = Vec::new();
    let mut current_field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes {
                    // Check for escaped quote ("")
                    if chars.peek() == Some(&'"') {
                        current_field.push('"');
                        chars.next();
                    } else {
                        in_quotes = false;
                    }
                } else {
                    in_quotes = true;
                }
            }
            c if c == delimiter && !in_quotes => {
                result.push(current_field.trim().to_string());
                current_field = String::new();
            }
            _ => {
                current_field.push(c);
            }
        }
    }

    // Don't forget the last field
    result.push(current_field.trim().to_string());
    result
}

fn count_unquoted(line: &str, delimiter: char) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for c in line.chars() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_csv() {
        let content = "name,age,city\nAlice,30,NYC\nBob,25,LA";
        let parser = CsvParser::new();
        let (headers, rows) = parser.parse_content(content).unwrap();

        assert_eq!(headers, vec!["name", "age", "city"]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&json!("Alice")));
        assert_eq!(rows[1].get("age"), Some(&json!("25")));
    }

    #[test]
    fn test_parse_quoted_value_with_delimiter() {
        let content = "a;b\n\"x;y\";2";
        let parser = CsvParser::new().with_delimiter(';');
        let (_, rows) = parser.parse_content(content).unwrap();

        assert_eq!(rows[0].get("a"), Some(&json!("x;y")));
    }

    #[test]
    fn test_short_rows_are_padded_and_blank_rows_dropped() {
        let content = "a,b,c\n1\n,,\n4,5,6";
        let (_, rows) = CsvParser::new().parse_content(content).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("c"), Some(&json!("")));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(CsvParser::detect_delimiter("a,b,c"), ',');
        assert_eq!(CsvParser::detect_delimiter("a;b;c"), ';');
        assert_eq!(CsvParser::detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(CsvParser::detect_delimiter("\"x;y;z\",b"), ',');
        assert_eq!(CsvParser::detect_delimiter("single"), ',');
    }

    #[test]
    fn test_split_line_respects_quotes() {
        assert_eq!(
            split_line("\"First, Name\",Age,\"Say \"\"hi\"\"\"", ','),
            vec!["First, Name", "Age", "Say \"hi\""]
        );
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"caf\xe9,ok";
        assert_eq!(decode_bytes(bytes), "café,ok");
    }

    #[test]
    fn test_decode_strips_utf8_bom() {
        let bytes = b"\xef\xbb\xbfa,b";
        assert_eq!(decode_bytes(bytes), "a,b");
    }
}
