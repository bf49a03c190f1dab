//! The heuristic parser cascade.
//!
//! Four dialect matchers are tried in order, first success wins; each is a
//! pure `&str -> Option<LogEntry>` and the final fallback is total, so
//! `parse` never fails. Ambiguous input degrades to a partial record, it
//! does not error.

use super::ansi::{self, StyledSpan};
use super::fields;
use super::json;
use super::model::{LogEntry, Severity};
use super::timestamp;

/// Parse one logical entry's raw text into a structured record.
///
/// Deterministic and total: re-parsing an emitted entry's `raw` yields the
/// same record.
pub fn parse(text: &str) -> LogEntry {
    json::parse_json_entry(text)
        .or_else(|| parse_bracketed_logger(text))
        .or_else(|| parse_query_log(text))
        .unwrap_or_else(|| parse_plain(text))
}

/// `[HH:MM:SS.mmm] LEVEL (pid): message {json-tail}` — the fixed shape
/// emitted by pino-style pretty printers. The bracket must hold a parseable
/// timestamp and the next token a recognizable level, otherwise the generic
/// path takes over.
fn parse_bracketed_logger(text: &str) -> Option<LogEntry> {
    let stripped = ansi::strip_ansi(text);
    let s = stripped.trim();

    let inner = s.strip_prefix('[')?;
    let close = inner.find(']')?;
    let dt = timestamp::normalize(&inner[..close])?;

    let mut rest = inner[close + 1..].trim_start();

    let level_end = rest
        .find(|c: char| c.is_whitespace() || c == '(' || c == ':')
        .unwrap_or(rest.len());
    let level = Severity::fold(&rest[..level_end])?;
    rest = rest[level_end..].trim_start();

    let mut entry = LogEntry {
        raw: text.to_string(),
        timestamp: timestamp::to_rfc3339(&dt),
        level,
        ..LogEntry::default()
    };

    if let Some(after_paren) = rest.strip_prefix('(') {
        let close = after_paren.find(')')?;
        let pid = &after_paren[..close];
        if !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit()) {
            entry.fields.insert("pid".to_string(), pid.to_string());
        }
        rest = after_paren[close + 1..].trim_start();
    }
    rest = rest.strip_prefix(':').unwrap_or(rest).trim_start();

    let mut message = rest.to_string();
    if let Some(start) = fields::find_json_suffix(&message) {
        let tail = message[start..].trim_end().to_string();
        if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(&tail) {
            json::lift_json_tail(&obj, &mut entry.fields);
            message.truncate(start);
        }
    }
    entry.message = message.trim().to_string();
    Some(entry)
}

/// `[query] statement [took N ms, M rows affected]` — ORM query logs. The
/// statement is kept verbatim as the message; no key=value scanning runs
/// over SQL text.
fn parse_query_log(text: &str) -> Option<LogEntry> {
    let stripped = ansi::strip_ansi(text);
    let s = stripped.trim();
    let rest = s.strip_prefix("[query]")?.trim_start();

    let mut entry = LogEntry {
        raw: text.to_string(),
        ..LogEntry::default()
    };
    entry.fields.insert("type".to_string(), "query".to_string());

    let mut statement = rest;
    if let Some(open) = rest.rfind('[') {
        if let Some(inner) = rest[open..].strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            if let Some(timing) = inner.strip_prefix("took ") {
                statement = rest[..open].trim_end();
                let mut parts = timing.split(',');
                if let Some(duration) = parts.next() {
                    if let Some(ms) = duration.trim().strip_suffix(" ms") {
                        entry
                            .fields
                            .insert("duration_ms".to_string(), ms.trim().to_string());
                    }
                }
                if let Some(rows_part) = parts.next() {
                    let rows: String = rows_part
                        .trim()
                        .chars()
                        .take_while(|c| c.is_ascii_digit())
                        .collect();
                    if !rows.is_empty() {
                        entry.fields.insert("rows".to_string(), rows);
                    }
                }
            }
        }
    }
    entry.message = statement.trim().to_string();
    Some(entry)
}

/// Generic ANSI/plaintext fallback: style-span key=value pairing, then
/// leading timestamp, severity token, `path:line` token, balanced JSON
/// suffix and generic key=value scanning over what remains.
fn parse_plain(text: &str) -> LogEntry {
    let mut entry = LogEntry {
        raw: text.to_string(),
        ..LogEntry::default()
    };

    let spans = ansi::styled_spans(text);
    let mut rest = if spans.len() > 1 {
        extract_span_fields(spans, &mut entry)
    } else {
        spans.into_iter().next().map(|s| s.text).unwrap_or_default()
    };

    // Leading timestamp, possibly spanning several tokens.
    let lead_ws = rest.len() - rest.trim_start().len();
    if lead_ws <= 3 {
        if let Some((len, dt)) = timestamp::find_leading(&rest[lead_ws..]) {
            entry.timestamp = timestamp::to_rfc3339(&dt);
            rest.replace_range(lead_ws..lead_ws + len, "");
        }
    }

    // Severity token near the start ("INFO", "[warn]", "ERROR:").
    if entry.level.is_none() {
        let mut hit = None;
        for (start, end, token) in tokens_with_spans(&rest) {
            if start > 10 {
                break;
            }
            let clean = token.trim_matches(|c| matches!(c, '[' | ']' | '(' | ')' | ':' | '-'));
            if let Some(level) = Severity::fold(clean) {
                hit = Some((start, end, level));
                break;
            }
        }
        if let Some((start, end, level)) = hit {
            entry.level = level;
            rest.replace_range(start..end, "");
        }
    }

    // First source-location token anywhere in the entry.
    let mut location = None;
    for (start, end, token) in tokens_with_spans(&rest) {
        let clean = token.trim_matches(|c| matches!(c, '(' | ')' | '[' | ']' | ',' | ';'));
        if fields::is_file_location(clean) {
            location = Some((start, end, clean.to_string()));
            break;
        }
    }
    if let Some((start, end, token)) = location {
        entry.file = token;
        rest.replace_range(start..end, "");
    }

    // Balanced JSON suffix — same lifting as the structured-logger tail, so
    // request/response fields are recovered even without a bracketed prefix.
    if let Some(start) = fields::find_json_suffix(&rest) {
        let tail = rest[start..].trim_end().to_string();
        if let Ok(serde_json::Value::Object(obj)) = serde_json::from_str(&tail) {
            json::lift_json_tail(&obj, &mut entry.fields);
            rest.truncate(start);
        }
    }

    let (kv, remaining) = fields::extract_key_values(&rest);
    entry.fields.extend(kv);

    entry.message = tidy_message(&remaining);
    entry
}

/// Pair a `key=` span with the value at the head of the following span.
/// Loggers that colorize keys and values separately produce exactly this
/// shape; the consumed text is removed and the rest is re-joined.
fn extract_span_fields(spans: Vec<StyledSpan>, entry: &mut LogEntry) -> String {
    let mut texts: Vec<String> = spans.into_iter().map(|s| s.text).collect();

    for i in 0..texts.len().saturating_sub(1) {
        let current = &texts[i];
        if !current.ends_with('=') {
            continue;
        }
        let key_start = current
            .char_indices()
            .filter(|(_, c)| c.is_whitespace())
            .last()
            .map(|(idx, c)| idx + c.len_utf8())
            .unwrap_or(0);
        let key = &current[key_start..current.len() - 1];
        if key.is_empty() || !key.bytes().all(fields::is_key_byte) {
            continue;
        }

        // The value span must follow immediately, no intervening blank.
        let next = &texts[i + 1];
        if next.is_empty() || next.starts_with(char::is_whitespace) {
            continue;
        }
        let value_end = next
            .find(char::is_whitespace)
            .unwrap_or(next.len());
        let value = next[..value_end].to_string();

        let key = key.to_string();
        let tail = next[value_end..].to_string();
        texts[i].truncate(key_start);
        texts[i + 1] = tail;
        entry
            .fields
            .insert(key, fields::normalize_json_value(&value));
    }

    texts.concat()
}

fn tokens_with_spans(s: &str) -> Vec<(usize, usize, &str)> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices() {
        if c.is_whitespace() {
            if let Some(st) = start.take() {
                out.push((st, i, &s[st..i]));
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(st) = start {
        out.push((st, s.len(), &s[st..]));
    }
    out
}

/// Collapse the gaps left by token removal while preserving the line
/// structure of multi-line entries.
fn tidy_message(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&collapsed);
    }
    out
}
