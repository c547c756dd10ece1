// Header sanitization for staged CSV files.
//
// Every header token ends up as a plain identifier the model artifact can carry
// verbatim. An `id` header is renamed so the schema builder can add its own
// synthetic `ID` key without producing two primary keys.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Replacement for a header that equals `id` (case-insensitive)
pub const RENAMED_ID_HEADER: &str = "datasource_id";

static TAG_TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^#[A-Za-z][A-Za-z0-9_]*(\s*\+[A-Za-z][A-Za-z0-9_]*)*$").unwrap()
});

/// Sanitize one header token:
/// 1) strip characters matched by `reject` (outside the header alphabet)
/// 2) `id` -> `datasource_id`
/// 3) numeric-leading tokens get an `n` prefix
/// 4) truncate to `max_len` characters
pub fn sanitize_header(token: &str, reject: &Regex, max_len: usize) -> String {
    let token = token.trim();
    // A header renamed on an earlier pass is already clean
    if token == RENAMED_ID_HEADER {
        return truncate(token, max_len);
    }
    let stripped = reject.replace_all(token, "").to_string();

    let renamed = if stripped.eq_ignore_ascii_case("id") {
        RENAMED_ID_HEADER.to_string()
    } else {
        stripped
    };

    let prefixed = if renamed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("n{}", renamed)
    } else {
        renamed
    };

    truncate(&prefixed, max_len)
}

fn truncate(name: &str, max_len: usize) -> String {
    name.chars().take(max_len).collect()
}

/// Sanitize a whole header row: empty tokens become `column<N>`,
/// duplicates get numeric suffixes.
pub fn sanitize_headers(tokens: &[String], reject: &Regex, max_len: usize) -> Vec<String> {
    let mut used = HashSet::new();
    tokens
        .iter()
        .enumerate()
        .map(|(idx, token)| {
            let clean = sanitize_header(token, reject, max_len);
            let base = if clean.is_empty() {
                format!("column{}", idx + 1)
            } else {
                clean
            };
            unique_name(base, &mut used, max_len)
        })
        .collect()
}

/// Whether a row consists of machine-readable tag annotations (HXL hashtags)
pub fn is_tag_row(tokens: &[String]) -> bool {
    let mut seen_tag = false;
    for token in tokens.iter().map(|t| t.trim()) {
        if token.is_empty() {
            continue;
        }
        if !TAG_TOKEN_PATTERN.is_match(token) {
            return false;
        }
        seen_tag = true;
    }
    seen_tag
}

/// First free name of `base`, `base2`, `base3`, ... that fits in `max_len`.
/// The base is shortened to make room for the suffix.
pub fn unique_name(base: String, used: &mut HashSet<String>, max_len: usize) -> String {
    if !used.contains(&base) {
        used.insert(base.clone());
        return base;
    }
    let mut idx = 2;
    loop {
        let suffix = idx.to_string();
        let room = max_len.saturating_sub(suffix.len());
        let candidate = format!("{}{}", truncate(&base, room), suffix);
        if !used.contains(&candidate) {
            used.insert(candidate.clone());
            return candidate;
        }
        idx += 1;
    }
}
