use std::collections::BTreeMap;
use serde::{Serialize, Serializer};

/// Normalized severity, folded from the many spellings containers emit.
///
/// The canonical tokens are deliberately short (`TRC`..`ERR`) so they align
/// in column display; `None` is the absent-level sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    None,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRC",
            Severity::Debug => "DBG",
            Severity::Info => "INF",
            Severity::Warn => "WRN",
            Severity::Error => "ERR",
            Severity::None => "NONE",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Severity::None)
    }

    /// Fold a severity spelling to its canonical token.
    ///
    /// Only exact synonyms match — folding substrings of ordinary words
    /// ("information", "debuggable") would misclassify free text.
    pub fn fold(token: &str) -> Option<Severity> {
        let lower = token.to_ascii_lowercase();
        match lower.as_str() {
            "trace" | "trc" => Some(Severity::Trace),
            "debug" | "dbg" => Some(Severity::Debug),
            "info" | "inf" => Some(Severity::Info),
            "warn" | "warning" | "wrn" => Some(Severity::Warn),
            "error" | "err" | "fatal" | "crit" | "critical" | "panic" => Some(Severity::Error),
            _ => None,
        }
    }

    /// Fold a numeric level on the 10/20/30/40/50 convention used by
    /// pino, bunyan and friends.
    pub fn fold_number(n: i64) -> Option<Severity> {
        match n {
            1..=15 => Some(Severity::Trace),
            16..=25 => Some(Severity::Debug),
            26..=35 => Some(Severity::Info),
            36..=45 => Some(Severity::Warn),
            46..=100 => Some(Severity::Error),
            _ => None,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl Default for Severity {
    fn default() -> Self {
        Severity::None
    }
}

/// One structured log record, the unit the heuristic parser produces.
///
/// `raw` is the audit-of-record: the exact original text of every physical
/// line in the logical entry, newline-joined, ANSI codes intact. Everything
/// else is best-effort extraction and may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogEntry {
    pub raw: String,
    /// Canonical RFC-3339 UTC string, empty when no timestamp was found.
    pub timestamp: String,
    pub level: Severity,
    /// `path:line` source location, empty when absent.
    pub file: String,
    pub message: String,
    /// Open key/value field set. Keys are unique (last write wins); values
    /// that are themselves JSON are re-encoded compactly so equivalent
    /// payloads compare equal regardless of escaping depth.
    pub fields: BTreeMap<String, String>,
    pub is_json: bool,
    /// Decoded JSON tree for keys not lifted into dedicated attributes.
    /// Only set when the whole entry parsed as a JSON object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_fields: Option<serde_json::Map<String, serde_json::Value>>,
}

impl LogEntry {
    /// Entry carrying nothing but its original text. The parser's floor:
    /// every cascade stage degrades to this rather than failing.
    pub fn plain(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            message: raw.trim().to_string(),
            ..Self::default()
        }
    }
}
