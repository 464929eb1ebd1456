//! Shared utility functions used across multiple modules.

use chrono::{DateTime, SecondsFormat};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Render a Unix millisecond timestamp as an RFC 3339 UTC string.
pub fn rfc3339_from_millis(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Byte count rounded to the nearest KiB, for human-facing messages.
pub const fn rounded_kib(bytes: usize) -> usize {
    (bytes + 512) / 1024
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" storage ".to_string())),
            Some("storage".to_string())
        );
    }

    #[test]
    fn rfc3339_from_millis_renders_utc() {
        assert_eq!(
            rfc3339_from_millis(0).as_deref(),
            Some("1970-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn rounded_kib_rounds_half_up() {
        assert_eq!(rounded_kib(0), 0);
        assert_eq!(rounded_kib(1024 * 1024), 1024);
        assert_eq!(rounded_kib(1536), 2);
        assert_eq!(rounded_kib(1535), 1);
    }
}
