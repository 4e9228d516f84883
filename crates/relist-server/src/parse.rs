//! Free-text parsing helpers for manually entered listing fields.

/// Unit multipliers for capacity strings, checked in order. Anything
/// without a recognized unit is taken as gigabytes.
const CAPACITY_UNITS: &[(&str, f64)] = &[("tb", 1024.0), ("gb", 1.0)];

/// Extracts the first decimal or integer number from a string.
///
/// `"1.5TB NVMe"` yields `Some(1.5)`; a string with no digits yields `None`.
pub fn take_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let start = bytes.iter().position(|b| b.is_ascii_digit())?;

    let mut end = start;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    // optional fractional part
    if end < bytes.len()
        && bytes[end] == b'.'
        && end + 1 < bytes.len()
        && bytes[end + 1].is_ascii_digit()
    {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }

    s[start..end].parse().ok()
}

/// Parses a free-text capacity ("512GB", "1TB", "1.5 tb") into whole
/// gigabytes. A string with no digits yields `None`, not zero.
pub fn parse_capacity_gb(s: &str) -> Option<u32> {
    let num = take_number(s)?;
    let lower = s.to_lowercase();
    let multiplier = CAPACITY_UNITS
        .iter()
        .find(|(unit, _)| lower.contains(unit))
        .map(|(_, m)| *m)
        .unwrap_or(1.0);
    Some((num * multiplier).round() as u32)
}

/// Lowercases and reduces a title to `[a-z0-9-]` for use as a storage key
/// prefix. Returns `None` when nothing usable remains.
pub fn slugify(s: &str) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut prev_dash = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
