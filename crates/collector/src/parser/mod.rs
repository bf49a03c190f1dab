//! Heuristic log parsing and normalization.
//!
//! Converts one logical entry's raw text into a structured record without a
//! schema contract from the producer. The dispatch is an ordered cascade of
//! pure matchers (whole-entry JSON, bracketed structured logger, query log,
//! generic ANSI/plaintext) — first match wins, the fallback is total.
//!
//! # Module layout
//!
//! - `model.rs`: `LogEntry` and the folded `Severity` set
//! - `parse.rs`: the cascade and the generic plaintext path
//! - `boundary.rs`: physical-line → logical-entry boundary decisions
//! - `timestamp.rs`: layout-cascade timestamp normalization
//! - `fields.rs`: key=value scanning and balanced-span helpers
//! - `json.rs`: whole-entry JSON and request/response tail lifting
//! - `ansi.rs`: escape stripping with style-span tracking

pub mod ansi;
pub mod boundary;
pub mod fields;
pub mod json;
pub mod model;
pub mod parse;
pub mod timestamp;

pub use boundary::{classify, LineDisposition};
pub use model::{LogEntry, Severity};
pub use parse::parse;
