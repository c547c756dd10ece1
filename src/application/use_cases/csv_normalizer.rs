// ============================================================
// CSV NORMALIZER USE CASE
// ============================================================
// Repair a staged CSV file before it is tokenized into records:
// delimiter detection, header sanitization, embedded-newline
// reconstruction and optional tag-row removal

use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::domain::dataset::IngestConfig;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::artifact_store::atomic_write_bytes;
use crate::infrastructure::csv::header::{is_tag_row, sanitize_headers};
use crate::infrastructure::csv::{split_line, CsvParser};

/// Result of normalizing one CSV document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCsv {
    /// Delimiter detected on the header line, kept for the rewritten file
    pub delimiter: char,

    /// Sanitized header row
    pub headers: Vec<String>,

    /// Normalized CSV text: one header line, one line per logical row
    pub content: String,

    /// A tag row directly below the header was dropped
    pub tag_row_removed: bool,
}

impl NormalizedCsv {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }
}

/// CSV normalization use case
pub struct CsvNormalizer {
    reject: Regex,
    max_header_len: usize,
    tag_row_marker: Option<String>,
}

impl CsvNormalizer {
    pub fn new(config: &IngestConfig) -> Result<Self> {
        let reject = config
            .header_reject_pattern()
            .map_err(AppError::ConfigError)?;
        Ok(Self {
            reject,
            max_header_len: config.max_header_len,
            tag_row_marker: config
                .tag_row_marker
                .as_ref()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty()),
        })
    }

    /// Normalize a staged file and rewrite it in place when anything changed
    pub fn normalize_file(&self, path: &Path) -> Result<NormalizedCsv> {
        let raw = CsvParser::read_with_encoding_detection(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let normalized = self.normalize_content(&raw, file_name);
        if normalized.headers.is_empty() {
            debug!(path = %path.display(), "No CSV header found, file left as is");
        } else if normalized.content != raw {
            atomic_write_bytes(path, normalized.content.as_bytes())?;
            info!(
                path = %path.display(),
                delimiter = ?normalized.delimiter,
                columns = normalized.column_count(),
                tag_row_removed = normalized.tag_row_removed,
                "CSV normalized"
            );
        } else {
            debug!(path = %path.display(), "CSV already normalized");
        }
        Ok(normalized)
    }

    /// Normalize CSV text. `file_name` decides whether the tag-row check applies.
    pub fn normalize_content(&self, raw: &str, file_name: &str) -> NormalizedCsv {
        let mut rest = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        // Blank lines above the header are dropped like any other blank line
        let (header_line, body) = loop {
            let (line, tail) = match rest.find('\n') {
                Some(idx) => (&rest[..idx], &rest[idx + 1..]),
                None => (rest, ""),
            };
            if !line.trim().is_empty() || tail.is_empty() {
                break (line.trim_end_matches('\r'), tail);
            }
            rest = tail;
        };

        if header_line.trim().is_empty() {
            return NormalizedCsv {
                delimiter: ',',
                headers: Vec::new(),
                content: String::new(),
                tag_row_removed: false,
            };
        }

        let delimiter = CsvParser::detect_delimiter(header_line);
        let headers = sanitize_headers(
            &split_line(header_line, delimiter),
            &self.reject,
            self.max_header_len,
        );

        let mut rows = reconstruct_rows(body, delimiter, headers.len());

        let mut tag_row_removed = false;
        if self.checks_tag_row(file_name) {
            if let Some(first) = rows.lines().next() {
                if is_tag_row(&split_line(first, delimiter)) {
                    rows = rows[first.len()..].trim_start_matches('\n').to_string();
                    tag_row_removed = true;
                }
            }
        }

        let mut content = headers.join(&delimiter.to_string());
        content.push('\n');
        content.push_str(&rows);

        NormalizedCsv {
            delimiter,
            headers,
            content,
            tag_row_removed,
        }
    }

    fn checks_tag_row(&self, file_name: &str) -> bool {
        match &self.tag_row_marker {
            Some(marker) => file_name.to_lowercase().contains(marker.as_str()),
            None => true,
        }
    }
}

/// Rebuild logical rows from the body of a CSV file.
///
/// A line break is a row boundary only once `column_count - 1` unquoted
/// delimiters were seen since the row started; earlier breaks are interior to
/// a wrapped value and collapse into a single space. CRLF counts as one break
/// and blank lines at a row boundary are dropped. Every emitted row ends in `\n`.
pub fn reconstruct_rows(body: &str, delimiter: char, column_count: usize) -> String {
    let needed = column_count.saturating_sub(1);
    let mut out = String::with_capacity(body.len() + 1);

    let mut inside_quote = false;
    let mut separators = 0usize;
    let mut row_has_content = false;
    let mut pending_space = false;

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' || c == '\n' {
            if c == '\r' && chars.peek() == Some(&'\n') {
                chars.next();
            }
            if !row_has_content {
                continue;
            }
            if separators < needed {
                pending_space = true;
            } else {
                out.push('\n');
                separators = 0;
                row_has_content = false;
                pending_space = false;
            }
            continue;
        }

        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        if c == '"' {
            inside_quote = !inside_quote;
        } else if c == delimiter && !inside_quote {
            separators += 1;
        }
        out.push(c);
        row_has_content = true;
    }

    if row_has_content {
        out.push('\n');
    }
    out
}
