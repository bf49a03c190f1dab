//! Timestamp normalization — candidate string → canonical UTC instant.
//!
//! Containers emit timestamps in whatever layout their logger favours, so
//! normalization is an ordered walk over the layouts seen in practice.
//! Layouts that omit the calendar date (bare times, month-name syslog
//! prefixes) are anchored to the current UTC date at parse time.

use chrono::{DateTime, Datelike, NaiveDateTime, NaiveTime, SecondsFormat, TimeZone, Utc};

/// Datetime layouts that carry an explicit offset.
const OFFSET_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%d/%b/%Y:%H:%M:%S %z",
];

/// Datetime layouts without an offset — interpreted as UTC.
const NAIVE_LAYOUTS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d %b %Y %H:%M:%S%.f",
    "%a %b %e %H:%M:%S %Y",
];

/// Month-name layouts with no year (classic syslog). The current year is
/// prepended before parsing.
const YEARLESS_LAYOUTS: &[&str] = &[
    "%Y %b %e %H:%M:%S%.f",
    "%Y %b %e %H:%M:%S",
];

/// Time-of-day layouts, anchored to the current UTC date.
const TIME_LAYOUTS: &[&str] = &[
    "%H:%M:%S%.f",
    "%I:%M:%S%.f %p",
    "%I:%M %p",
];

/// Try to interpret `raw` as a timestamp. Returns `None` for empty or
/// unrecognized input; never panics.
pub fn normalize(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    // Bracketed variants recurse on the inner text: "[12:34:56 PM]".
    if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        return normalize(inner);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in OFFSET_LAYOUTS {
        if let Ok(dt) = DateTime::parse_from_str(s, layout) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for layout in NAIVE_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // "Oct  3 19:57:52.076536" — anchor to the current year.
    let with_year = format!("{} {}", Utc::now().year(), s);
    for layout in YEARLESS_LAYOUTS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&with_year, layout) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    // "19:57:52.076536" — anchor to the current UTC date.
    for layout in TIME_LAYOUTS {
        if let Ok(time) = NaiveTime::parse_from_str(s, layout) {
            let today = Utc::now().date_naive();
            return Some(Utc.from_utc_datetime(&today.and_time(time)));
        }
    }

    // Purely numeric: exactly 10 digits → Unix seconds, 13 → milliseconds.
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        if s.len() == 10 {
            if let Ok(secs) = s.parse::<i64>() {
                return Utc.timestamp_opt(secs, 0).single();
            }
        }
        if s.len() == 13 {
            if let Ok(millis) = s.parse::<i64>() {
                return DateTime::from_timestamp_millis(millis);
            }
        }
    }

    None
}

/// Canonical rendering. `AutoSi` keeps exactly the precision the source
/// carried, so `19:57:52.076536` round-trips without a trailing zero pad.
pub fn to_rfc3339(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Locate a timestamp at the start of `text` (ANSI already removed).
///
/// Timestamps may span several whitespace-separated tokens ("Oct  3
/// 19:57:52.076536", "2024-01-01 00:00:00"), so prefixes of one to four
/// tokens are tried longest-first. Returns the matched byte length and the
/// parsed instant.
pub fn find_leading(text: &str) -> Option<(usize, DateTime<Utc>)> {
    // Bracketed prefix: "[2024-01-01T00:00:00Z] ..."
    if text.starts_with('[') {
        if let Some(close) = text.find(']').filter(|&c| c <= 48) {
            if let Some(dt) = normalize(&text[1..close]) {
                return Some((close + 1, dt));
            }
        }
    }

    let mut ends = Vec::with_capacity(4);
    let mut in_token = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if in_token {
                ends.push(i);
                in_token = false;
                if ends.len() == 4 {
                    break;
                }
            }
        } else {
            in_token = true;
        }
    }
    if in_token && ends.len() < 4 {
        ends.push(text.len());
    }

    for &end in ends.iter().rev() {
        if let Some(dt) = normalize(&text[..end]) {
            return Some((end, dt));
        }
    }
    None
}
