//! Whole-entry JSON decoding and embedded request/response lifting.
//!
//! Structured loggers disagree on field names, so each dedicated attribute
//! is resolved through an ordered alias list — first present alias wins and
//! is consumed. Everything else lands in the open field set twice: as a
//! stringified `fields` entry and in the decoded `json_fields` tree.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::model::{LogEntry, Severity};
use super::timestamp;

const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "@timestamp", "time", "ts", "datetime", "date"];
const LEVEL_ALIASES: &[&str] = &["level", "severity", "log_level", "loglevel", "lvl"];
const MESSAGE_ALIASES: &[&str] = &["message", "msg", "text", "log", "event"];

/// Parse an entry whose entire text is a JSON object. Returns `None` for
/// anything else (arrays and primitives are not log records).
pub fn parse_json_entry(text: &str) -> Option<LogEntry> {
    let trimmed = text.trim();
    if !trimmed.starts_with('{') || !trimmed.ends_with('}') {
        return None;
    }
    let value: Value = serde_json::from_str(trimmed).ok()?;
    let Value::Object(mut obj) = value else {
        return None;
    };

    let mut entry = LogEntry {
        raw: text.to_string(),
        is_json: true,
        ..LogEntry::default()
    };

    for alias in TIMESTAMP_ALIASES {
        if let Some(v) = obj.remove(*alias) {
            if let Some(dt) = json_timestamp(&v) {
                entry.timestamp = timestamp::to_rfc3339(&dt);
            }
            break;
        }
    }

    for alias in LEVEL_ALIASES {
        if let Some(v) = obj.remove(*alias) {
            entry.level = json_level(&v);
            break;
        }
    }

    for alias in MESSAGE_ALIASES {
        if let Some(v) = obj.remove(*alias) {
            entry.message = match v {
                Value::String(s) => s,
                other => value_to_string(&other),
            };
            break;
        }
    }

    for (key, v) in &obj {
        entry.fields.insert(key.clone(), value_to_string(v));
    }
    entry.json_fields = Some(obj);

    Some(entry)
}

/// Flatten the well-known request/response shape of an embedded JSON tail
/// (`{"req":{...},"res":{...},"responseTime":12}`) into flat fields. Keys
/// without a dedicated mapping are stringified as-is.
pub fn lift_json_tail(obj: &Map<String, Value>, fields: &mut BTreeMap<String, String>) {
    for (key, v) in obj {
        match key.as_str() {
            "req" | "request" => {
                if let Some(req) = v.as_object() {
                    lift_scalar(req, &["method"], "method", fields);
                    lift_scalar(req, &["url", "path"], "url", fields);
                    if let Some(headers) = req.get("headers").and_then(Value::as_object) {
                        lift_scalar(headers, &["host"], "host", fields);
                        lift_scalar(headers, &["user-agent"], "user_agent", fields);
                    }
                } else {
                    fields.insert(key.clone(), value_to_string(v));
                }
            }
            "res" | "response" => {
                if let Some(res) = v.as_object() {
                    lift_scalar(res, &["statusCode", "status"], "status", fields);
                } else {
                    fields.insert(key.clone(), value_to_string(v));
                }
            }
            "responseTime" | "elapsed" | "duration" | "duration_ms" => {
                fields.insert("duration_ms".to_string(), value_to_string(v));
            }
            _ => {
                fields.insert(key.clone(), value_to_string(v));
            }
        }
    }
}

fn lift_scalar(
    obj: &Map<String, Value>,
    aliases: &[&str],
    target: &str,
    fields: &mut BTreeMap<String, String>,
) {
    for alias in aliases {
        if let Some(v) = obj.get(*alias) {
            fields.insert(target.to_string(), value_to_string(v));
            return;
        }
    }
}

/// Stringify a JSON value for the flat field map: scalars lose their
/// quoting, composites are re-serialized compactly.
pub fn value_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        composite => serde_json::to_string(composite).unwrap_or_default(),
    }
}

fn json_timestamp(v: &Value) -> Option<chrono::DateTime<chrono::Utc>> {
    match v {
        Value::String(s) => timestamp::normalize(s),
        Value::Number(n) => {
            let n = n.as_i64()?;
            // Millisecond epochs are 13 digits, second epochs 10.
            if n > 1_000_000_000_000 {
                chrono::DateTime::from_timestamp_millis(n)
            } else {
                chrono::DateTime::from_timestamp(n, 0)
            }
        }
        _ => None,
    }
}

fn json_level(v: &Value) -> Severity {
    match v {
        Value::String(s) => Severity::fold(s).unwrap_or(Severity::None),
        Value::Number(n) => n
            .as_i64()
            .and_then(Severity::fold_number)
            .unwrap_or(Severity::None),
        _ => Severity::None,
    }
}
