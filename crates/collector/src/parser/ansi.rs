//! ANSI escape handling.
//!
//! Colored logger output carries SGR sequences that break both boundary
//! detection and field extraction. Two views are provided: a plain strip
//! (zero-allocation when the text is clean), and a styled-span split that
//! remembers which SGR codes were active over each contiguous text run —
//! loggers that colorize keys and values differently leave a span boundary
//! exactly between `key=` and its value.

use std::borrow::Cow;

const ESC: u8 = 0x1b;

/// A contiguous run of text with the SGR parameter codes active over it.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSpan {
    pub styles: Vec<String>,
    pub text: String,
}

/// Strip ANSI escape sequences. Returns `Cow::Borrowed` when the input
/// contains no ESC byte.
pub fn strip_ansi(input: &str) -> Cow<'_, str> {
    if !input.as_bytes().contains(&ESC) {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len());
    for span in styled_spans(input) {
        out.push_str(&span.text);
    }
    Cow::Owned(out)
}

/// Split `input` into styled spans, dropping the escape sequences
/// themselves. A reset (`ESC[0m` or `ESC[m`) clears the active style set;
/// other SGR parameters accumulate. Non-SGR sequences (cursor movement,
/// OSC hyperlinks) are stripped without touching the style state.
pub fn styled_spans(input: &str) -> Vec<StyledSpan> {
    let bytes = input.as_bytes();
    let mut spans = Vec::new();
    let mut active: Vec<String> = Vec::new();
    let mut current = Vec::new();
    let mut i = 0;

    let close = |current: &mut Vec<u8>, active: &[String], spans: &mut Vec<StyledSpan>| {
        if !current.is_empty() {
            spans.push(StyledSpan {
                styles: active.to_vec(),
                text: String::from_utf8_lossy(current).into_owned(),
            });
            current.clear();
        }
    };

    while i < bytes.len() {
        if bytes[i] != ESC {
            current.push(bytes[i]);
            i += 1;
            continue;
        }
        if i + 1 >= bytes.len() {
            // Lone trailing ESC — incomplete sequence, drop it.
            break;
        }
        match bytes[i + 1] {
            b'[' => {
                // CSI: parameters until a final byte in 0x40-0x7E.
                let start = i + 2;
                let mut j = start;
                let mut terminator = 0u8;
                while j < bytes.len() {
                    let b = bytes[j];
                    j += 1;
                    if (0x40..=0x7e).contains(&b) {
                        terminator = b;
                        break;
                    }
                }
                if terminator == b'm' {
                    close(&mut current, &active, &mut spans);
                    apply_sgr(&bytes[start..j - 1], &mut active);
                }
                i = j;
            }
            b']' => {
                // OSC: until BEL or ST (ESC \).
                let mut j = i + 2;
                while j < bytes.len() {
                    if bytes[j] == 0x07 {
                        j += 1;
                        break;
                    }
                    if bytes[j] == ESC && j + 1 < bytes.len() && bytes[j + 1] == b'\\' {
                        j += 2;
                        break;
                    }
                    j += 1;
                }
                i = j;
            }
            c if (0x40..=0x5f).contains(&c) => {
                // Simple Fe sequence: ESC + single byte.
                i += 2;
            }
            _ => {
                // Unknown escape — drop the ESC, keep the next byte.
                i += 1;
            }
        }
    }
    close(&mut current, &active, &mut spans);
    spans
}

fn apply_sgr(params: &[u8], active: &mut Vec<String>) {
    let text = match std::str::from_utf8(params) {
        Ok(t) => t,
        Err(_) => return,
    };
    if text.is_empty() {
        active.clear();
        return;
    }
    for code in text.split(';') {
        if code.is_empty() || code == "0" {
            active.clear();
        } else if !active.iter().any(|c| c == code) {
            active.push(code.to_string());
        }
    }
}
