//! Per-source stream reassembly: raw byte chunks → logical entries.
//!
//! Owns all mutable per-stream state (frame carry, unterminated line
//! leftover, the open multi-line entry) so flush-on-shutdown is testable in
//! isolation. The pending entry is re-parsed every time a continuation
//! line lands, which keeps fields that only appear on later physical lines
//! (bound parameters, trailing key=value rows) attached to the entry that
//! owns them.

use std::sync::Arc;

use crate::parser::{self, LineDisposition, LogEntry};

use super::demux::FrameStripper;

pub struct Reassembler {
    source_id: Arc<str>,
    frames: FrameStripper,
    line_buf: Vec<u8>,
    pending: Option<Pending>,
    markers: Arc<Vec<String>>,
    max_entry_lines: usize,
}

struct Pending {
    raw: String,
    entry: LogEntry,
    lines: usize,
}

impl Reassembler {
    pub fn new(source_id: Arc<str>, markers: Arc<Vec<String>>, max_entry_lines: usize) -> Self {
        Self {
            source_id,
            frames: FrameStripper::new(),
            line_buf: Vec::new(),
            pending: None,
            markers,
            max_entry_lines: max_entry_lines.max(1),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Feed one transport read. Returns every entry completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<LogEntry> {
        let cleaned = self.frames.strip(chunk);
        self.line_buf.extend_from_slice(&cleaned);

        let mut out = Vec::new();
        while let Some(pos) = self.line_buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.line_buf.drain(..=pos).collect();
            line.pop(); // the newline
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let text = String::from_utf8_lossy(&line).into_owned();
            self.push_line(&text, &mut out);
        }
        out
    }

    /// Stream end (EOF, error or cancellation): everything buffered is
    /// flushed — at most the unterminated tail line and the open entry.
    pub fn finish(&mut self) -> Vec<LogEntry> {
        let mut out = Vec::new();

        let tail = self.frames.finish();
        self.line_buf.extend_from_slice(&tail);
        if !self.line_buf.is_empty() {
            let text = String::from_utf8_lossy(&self.line_buf).into_owned();
            self.line_buf.clear();
            let trimmed: String = text.trim_end_matches('\r').to_string();
            self.push_line(&trimmed, &mut out);
        }

        if let Some(pending) = self.pending.take() {
            out.push(pending.entry);
        }
        out
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some() || !self.line_buf.is_empty()
    }

    fn push_line(&mut self, line: &str, out: &mut Vec<LogEntry>) {
        // Blank lines never become entries and never break accumulation.
        if line.trim().is_empty() {
            return;
        }

        let disposition = parser::classify(
            line,
            self.pending.as_ref().map(|p| p.entry.message.as_str()),
            &self.markers,
        );

        match disposition {
            LineDisposition::Continues => {
                if let Some(pending) = self.pending.as_mut() {
                    pending.raw.push('\n');
                    pending.raw.push_str(line);
                    pending.lines += 1;
                    pending.entry = parser::parse(&pending.raw);
                    if pending.lines >= self.max_entry_lines {
                        tracing::debug!(
                            source = %self.source_id,
                            max_lines = self.max_entry_lines,
                            "entry line cap reached, flushing"
                        );
                        let done = self.pending.take().unwrap();
                        out.push(done.entry);
                    }
                } else {
                    // classify only answers Continues when an accumulator
                    // exists, but degrade gracefully anyway.
                    self.start_new(line);
                }
            }
            LineDisposition::StartsNew | LineDisposition::Standalone => {
                if let Some(done) = self.pending.take() {
                    out.push(done.entry);
                }
                self.start_new(line);
            }
        }
    }

    fn start_new(&mut self, line: &str) {
        self.pending = Some(Pending {
            raw: line.to_string(),
            entry: parser::parse(line),
            lines: 1,
        });
    }
}
