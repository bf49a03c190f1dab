//! Generic `key=value` recovery and small token matchers shared by the
//! parser cascade.
//!
//! The scanner is byte-level and allocation-light: keys are `[\w.]+` runs
//! followed by `=` at a token boundary; values are double-quoted strings
//! (backslash escaping), balanced `{...}`/`[...]` spans, or bare tokens.
//! Consumed pairs are removed from the working text so whatever survives
//! can become the free-text message.

use std::collections::BTreeMap;

pub(crate) fn is_key_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.'
}

/// If a `key=` token starts at `start`, return the index of the `=`.
/// `==` is rejected so comparison operators in messages survive.
fn key_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut j = start;
    while j < bytes.len() && is_key_byte(bytes[j]) {
        j += 1;
    }
    if j > start && j < bytes.len() && bytes[j] == b'=' && bytes.get(j + 1) != Some(&b'=') {
        Some(j)
    } else {
        None
    }
}

/// Exclusive end of a balanced bracket span starting at `start` (which must
/// hold `{` or `[`). Quote-aware: brackets inside string literals do not
/// count. Returns `None` when the span never closes.
pub fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
    let close = match bytes.get(start)? {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if in_str {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_str = false;
            }
        } else {
            match b {
                b'"' => in_str = true,
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth -= 1;
                    if depth == 0 {
                        return if b == close { Some(i + 1) } else { None };
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Find the start of a balanced `{...}` span that ends exactly at the end
/// of (trim-trailing) `text`. Validity as JSON is the caller's check.
pub fn find_json_suffix(text: &str) -> Option<usize> {
    let end = text.trim_end().len();
    if end == 0 || !text[..end].ends_with('}') {
        return None;
    }
    let bytes = text.as_bytes();
    for start in 0..end {
        if bytes[start] == b'{' && balanced_end(bytes, start) == Some(end) {
            return Some(start);
        }
    }
    None
}

/// Re-encode a JSON-shaped value compactly so equivalent payloads compare
/// equal regardless of original whitespace or escaping depth. Non-JSON
/// values come back unchanged.
pub fn normalize_json_value(value: &str) -> String {
    let trimmed = value.trim();
    let looks_composite = (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'));
    if looks_composite {
        if let Ok(v) = serde_json::from_str::<serde_json::Value>(trimmed) {
            if let Ok(compact) = serde_json::to_string(&v) {
                return compact;
            }
        }
    }
    value.to_string()
}

/// Scan `text` for `key=value` pairs. Returns the extracted fields (last
/// write wins on duplicate keys) and the text with consumed pairs removed.
pub fn extract_key_values(text: &str) -> (BTreeMap<String, String>, String) {
    let bytes = text.as_bytes();
    let mut fields = BTreeMap::new();
    let mut kept: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut at_boundary = true;
    let mut i = 0;

    while i < bytes.len() {
        if at_boundary {
            if let Some(eq) = key_end(bytes, i) {
                let key = text[i..eq].to_string();
                let (value, vend) = scan_value(text, eq + 1);
                fields.insert(key, normalize_json_value(&value));
                i = vend;
                at_boundary = true;
                continue;
            }
        }
        let b = bytes[i];
        kept.push(b);
        at_boundary = b.is_ascii_whitespace();
        i += 1;
    }

    (fields, String::from_utf8_lossy(&kept).into_owned())
}

fn scan_value(text: &str, vstart: usize) -> (String, usize) {
    let bytes = text.as_bytes();
    if vstart >= bytes.len() {
        return (String::new(), vstart);
    }
    match bytes[vstart] {
        b'"' => {
            let mut value = String::new();
            let mut escaped = false;
            let mut i = vstart + 1;
            while i < bytes.len() {
                let b = bytes[i];
                if !escaped && b == b'\\' {
                    escaped = true;
                    i += 1;
                    continue;
                }
                if !escaped && b == b'"' {
                    return (value, i + 1);
                }
                let ch_len = utf8_len(b);
                value.push_str(&text[i..i + ch_len]);
                i += ch_len;
                escaped = false;
            }
            (value, bytes.len())
        }
        b'{' | b'[' => match balanced_end(bytes, vstart) {
            Some(end) => (text[vstart..end].to_string(), end),
            None => scan_bare(text, vstart),
        },
        _ => scan_bare(text, vstart),
    }
}

fn scan_bare(text: &str, vstart: usize) -> (String, usize) {
    let bytes = text.as_bytes();
    let mut end = vstart;
    while end < bytes.len() && !bytes[end].is_ascii_whitespace() {
        end += 1;
    }
    (text[vstart..end].to_string(), end)
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

/// Accept only `path.ext:digits` tokens as source locations — arbitrary
/// colon-separated text (URLs, ratios, timestamps) must not match.
pub fn is_file_location(token: &str) -> bool {
    let Some((path, line)) = token.rsplit_once(':') else {
        return false;
    };
    if line.is_empty() || line.len() > 7 || !line.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let Some((stem, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if stem.is_empty()
        || !stem
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'/')
    {
        return false;
    }
    !ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric())
}
