use std::borrow::Cow;

use chrono::NaiveDateTime;
use encoding_rs::WINDOWS_1252;

const TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Parses a logger or command-line time using the formats seen in the navigation exports.
pub fn parse_log_time(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
}

/// Exports come either as UTF-8 or as windows-1252 (degree sign written as a single 0xB0 byte).
pub(crate) fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => WINDOWS_1252.decode_without_bom_handling(bytes).0,
    }
}

pub(crate) fn clean_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Gives repeated header names a numeric suffix so every column name is unique.
pub(crate) fn dedupe_header(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
            continue;
        }
        let mut suffix = 1;
        while out.contains(&format!("{name}.{suffix}")) {
            suffix += 1;
        }
        out.push(format!("{name}.{suffix}"));
    }
    out
}
