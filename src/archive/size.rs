//! Size string parsing and formatting
//!
//! Archive.org reports item sizes inconsistently: sometimes as a plain
//! byte count, sometimes as a human-readable string like "1.2G".

use regex::Regex;
use std::sync::OnceLock;

fn size_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([\d.]+)\s*([KMGTPE]?B?)?$").unwrap())
}

/// Parses a size string into bytes
///
/// Accepts bare byte counts ("1234567890") and binary-unit suffixes
/// ("1.2G", "500 MB"). Returns `None` for anything unparseable.
pub fn parse_size(input: &str) -> Option<i64> {
    let normalized = input.trim().to_uppercase();
    let captures = size_pattern().captures(&normalized)?;

    let value: f64 = captures.get(1)?.as_str().parse().ok()?;
    let unit = captures.get(2).map(|m| m.as_str()).unwrap_or("");

    let multiplier = match unit {
        "" | "B" => 1.0,
        "K" | "KB" => (1u64 << 10) as f64,
        "M" | "MB" => (1u64 << 20) as f64,
        "G" | "GB" => (1u64 << 30) as f64,
        "T" | "TB" => (1u64 << 40) as f64,
        _ => return None,
    };

    Some((value * multiplier).round() as i64)
}

/// Formats a byte count as a human-readable binary-unit string
pub fn format_bytes(bytes: i64) -> String {
    const UNIT: i64 = 1024;
    if bytes < UNIT {
        return format!("{bytes} B");
    }

    let mut div = UNIT;
    let mut exp = 0;
    let mut n = bytes / UNIT;
    while n >= UNIT {
        div *= UNIT;
        exp += 1;
        n /= UNIT;
    }

    let unit = ['K', 'M', 'G', 'T', 'P', 'E'][exp];
    format!("{:.1} {}iB", bytes as f64 / div as f64, unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size_bare_bytes() {
        assert_eq!(parse_size("1234567890"), Some(1234567890));
        assert_eq!(parse_size("1024B"), Some(1024));
        assert_eq!(parse_size("  42  "), Some(42));
    }

    #[test]
    fn test_parse_size_units() {
        assert_eq!(parse_size("1.2G"), Some(1_288_490_189));
        assert_eq!(parse_size("500 MB"), Some(500 * 1024 * 1024));
        assert_eq!(parse_size("2K"), Some(2048));
        assert_eq!(parse_size("1.5kb"), Some(1536));
        assert_eq!(parse_size("3T"), Some(3 * (1i64 << 40)));
    }

    #[test]
    fn test_parse_size_invalid() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("large"), None);
        assert_eq!(parse_size("1.2.3G"), None);
        assert_eq!(parse_size("G"), None);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(1_288_490_189), "1.2 GiB");
    }
}
