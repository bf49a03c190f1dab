//! Entry boundary detection.
//!
//! Decides whether a physical line opens a new logical entry or continues
//! the one being accumulated. The predicate is not purely "has a
//! timestamp": a timestamp-less line still continues the buffer when it is
//! indented, or when the buffered entry's message carries a multi-line-
//! prone marker such as `[sql]:` (statement header on one line, bound
//! parameters on the next).

use super::ansi;
use super::model::Severity;
use super::timestamp;

/// How the reassembler should treat one physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDisposition {
    /// Flush the pending entry and open a new one with this line.
    StartsNew,
    /// Append to the pending entry and re-parse the combined text.
    Continues,
    /// No boundary signal matched; becomes its own new entry.
    Standalone,
}

/// Classify `line` against the current accumulator state. `pending_message`
/// is the buffered entry's message when one is open; `markers` lists the
/// multi-line-prone constructs from configuration.
pub fn classify(
    line: &str,
    pending_message: Option<&str>,
    markers: &[String],
) -> LineDisposition {
    let stripped = ansi::strip_ansi(line);
    let s = stripped.as_ref();
    let trimmed = s.trim();

    // 1. A complete JSON object is always its own entry.
    if trimmed.starts_with('{')
        && trimmed.ends_with('}')
        && serde_json::from_str::<serde_json::Value>(trimmed)
            .map(|v| v.is_object())
            .unwrap_or(false)
    {
        return LineDisposition::StartsNew;
    }

    let lead_ws = s.len() - s.trim_start().len();
    if lead_ws <= 3 {
        let head = s.trim_start();

        // 2. Timestamp within the first few characters.
        if timestamp::find_leading(head).is_some() {
            return LineDisposition::StartsNew;
        }

        // 3. Severity token within the first ~10 characters.
        if has_leading_severity(head) {
            return LineDisposition::StartsNew;
        }

        // 4. Short bracketed prefix: "[info]", "[12:34:56 PM]", "[sql]".
        if let Some(rest) = head.strip_prefix('[') {
            if let Some(close) = rest.find(']') {
                if close > 0 && close <= 15 {
                    return LineDisposition::StartsNew;
                }
            }
        }
    }

    // 5. Indented line continues an open accumulator.
    if (s.starts_with(' ') || s.starts_with('\t')) && pending_message.is_some() {
        return LineDisposition::Continues;
    }

    // 6. The buffered entry announced a multi-line construct.
    if let Some(message) = pending_message {
        if markers.iter().any(|m| message.contains(m.as_str())) {
            return LineDisposition::Continues;
        }
    }

    LineDisposition::Standalone
}

fn has_leading_severity(head: &str) -> bool {
    let mut offset = 0;
    for token in head.split_whitespace() {
        let start = match head[offset..].find(token) {
            Some(pos) => offset + pos,
            None => break,
        };
        if start > 10 {
            break;
        }
        let clean = token.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')' | ':' | '-'));
        if Severity::fold(clean).is_some() {
            return true;
        }
        offset = start + token.len();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    const NO_MARKERS: &[String] = &[];

    fn sql_markers() -> Vec<String> {
        vec!["[sql]:".to_string()]
    }

    #[test]
    fn test_json_line_starts_new() {
        let d = classify(r#"{"level":"info","msg":"ok"}"#, Some("pending"), NO_MARKERS);
        assert_eq!(d, LineDisposition::StartsNew);
    }

    #[test]
    fn test_invalid_json_not_a_boundary_signal() {
        let d = classify("{broken json", None, NO_MARKERS);
        assert_eq!(d, LineDisposition::Standalone);
    }

    #[test]
    fn test_timestamped_line_starts_new() {
        for line in [
            "2024-01-01T00:00:00Z ready",
            "Oct  3 19:57:52.076536 INFO Starting service",
            "[2024-01-01T00:00:00Z] ready",
            "12:30:45 worker online",
        ] {
            assert_eq!(
                classify(line, Some("pending"), NO_MARKERS),
                LineDisposition::StartsNew,
                "line {line:?}"
            );
        }
    }

    #[test]
    fn test_severity_prefix_starts_new() {
        assert_eq!(
            classify("ERROR connection refused", Some("pending"), NO_MARKERS),
            LineDisposition::StartsNew
        );
        assert_eq!(
            classify("warn: low disk", Some("pending"), NO_MARKERS),
            LineDisposition::StartsNew
        );
    }

    #[test]
    fn test_severity_must_be_near_start() {
        // "error" appears too deep into the line to be a header.
        let d = classify("something bad: error occurred", Some("pending"), NO_MARKERS);
        assert_eq!(d, LineDisposition::Standalone);
    }

    #[test]
    fn test_bracketed_prefix_starts_new() {
        assert_eq!(
            classify("[info] cache warmed", Some("pending"), NO_MARKERS),
            LineDisposition::StartsNew
        );
        assert_eq!(
            classify("[12:34:56 PM] tick", Some("pending"), NO_MARKERS),
            LineDisposition::StartsNew
        );
    }

    #[test]
    fn test_indented_line_continues_open_accumulator() {
        assert_eq!(
            classify("    at com.example.App.main(App.java:15)", Some("pending"), NO_MARKERS),
            LineDisposition::Continues
        );
        assert_eq!(
            classify("\tat std::panicking::begin_panic", Some("pending"), NO_MARKERS),
            LineDisposition::Continues
        );
    }

    #[test]
    fn test_indented_line_without_accumulator_is_standalone() {
        assert_eq!(
            classify("    orphan continuation", None, NO_MARKERS),
            LineDisposition::Standalone
        );
    }

    #[test]
    fn test_marker_continues_unindented_line() {
        let markers = sql_markers();
        let d = classify(
            "parameters: [1, 2]",
            Some("[sql]: SELECT * FROM users"),
            &markers,
        );
        assert_eq!(d, LineDisposition::Continues);
    }

    #[test]
    fn test_no_marker_means_standalone() {
        let markers = sql_markers();
        let d = classify("parameters: [1, 2]", Some("plain message"), &markers);
        assert_eq!(d, LineDisposition::Standalone);
    }

    #[test]
    fn test_ansi_codes_removed_before_classification() {
        let d = classify("\x1b[31mERROR\x1b[0m boom", Some("pending"), NO_MARKERS);
        assert_eq!(d, LineDisposition::StartsNew);
    }

    #[test]
    fn test_deeply_indented_timestamp_still_continues() {
        // Four or more leading blanks mean the timestamp check is skipped.
        let d = classify("     2024-01-01T00:00:00Z detail", Some("pending"), NO_MARKERS);
        assert_eq!(d, LineDisposition::Continues);
    }
}
