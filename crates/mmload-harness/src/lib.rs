//! Driver tooling around `mmload-core`.
//!
//! This crate provides:
//! - Smoke run: fixed input with a check-by-check report plus a type sweep
//! - Corpus replay: multi-worker replay with merged statistics
//! - Structured logging: JSONL cycle records with input digests
//! - Reports: markdown/JSON statistics and per-cycle renderings
//! - Hex dump of raw inputs

#![forbid(unsafe_code)]

pub mod corpus;
pub mod hexdump;
pub mod report;
pub mod smoke;
pub mod structured_log;

pub use corpus::{HarnessError, ReplaySummary, load_corpus, replay};
pub use report::{CycleReport, StatsReport};
pub use smoke::{SmokeRun, run_smoke};
pub use structured_log::{LogEmitter, LogEntry};
