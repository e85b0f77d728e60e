//! Corpus replay across worker threads.
//!
//! Each worker owns a [`FuzzSession`]; snapshots and rejection tallies are
//! merged under a mutex once the worker finishes its batch.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use mmload_core::{CycleOutcome, FuzzSession, Policy, StatsSnapshot};
use parking_lot::Mutex;
use thiserror::Error;

use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("corpus directory {} holds no input files", .0.display())]
    EmptyCorpus(PathBuf),
    #[error("replay worker panicked")]
    WorkerPanicked,
}

/// One corpus file, fully read.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

/// Read every regular file directly under `dir`, sorted by path.
pub fn load_corpus(dir: &Path) -> Result<Vec<CorpusEntry>, HarnessError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    if paths.is_empty() {
        return Err(HarnessError::EmptyCorpus(dir.to_path_buf()));
    }
    paths
        .into_iter()
        .map(|path| -> Result<CorpusEntry, HarnessError> {
            let bytes = std::fs::read(&path)?;
            Ok(CorpusEntry { path, bytes })
        })
        .collect()
}

/// Merged outcome of a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub stats: StatsSnapshot,
    /// Keyed by rejection kind.
    pub rejections: BTreeMap<String, u64>,
    pub workers: usize,
}

impl ReplaySummary {
    fn absorb(&mut self, stats: StatsSnapshot, rejections: BTreeMap<String, u64>) {
        self.stats = self.stats.merge(stats);
        for (kind, count) in rejections {
            *self.rejections.entry(kind).or_default() += count;
        }
    }
}

/// Replay `entries` on `workers` threads (at least one). Entries are dealt
/// round-robin. When an emitter is given, every cycle is logged and a final
/// `replay_end` entry carries the merged counts and the run's wall time.
pub fn replay(
    entries: &[CorpusEntry],
    policy: Policy,
    workers: usize,
    log: Option<&Mutex<LogEmitter>>,
) -> Result<ReplaySummary, HarnessError> {
    let started = Instant::now();
    let workers = workers.clamp(1, entries.len().max(1));
    let merged = Mutex::new(ReplaySummary {
        workers,
        ..ReplaySummary::default()
    });

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let merged = &merged;
                scope.spawn(move || -> Result<(), HarnessError> {
                    let mut session = FuzzSession::new(policy);
                    let mut rejections = BTreeMap::new();
                    for entry in entries.iter().skip(worker).step_by(workers) {
                        let started = Instant::now();
                        let cycle = session.run_one(&entry.bytes);
                        let latency_ns =
                            u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
                        if let CycleOutcome::Rejected { rejection, .. } = &cycle {
                            *rejections.entry(rejection.kind().to_string()).or_insert(0) += 1;
                        }
                        if let Some(log) = log {
                            log.lock()
                                .emit_cycle(&entry.bytes, &cycle, policy.platform, latency_ns)?;
                        }
                    }
                    merged.lock().absorb(session.snapshot(), rejections);
                    Ok(())
                })
            })
            .collect();

        handles
            .into_iter()
            .try_for_each(|handle| handle.join().map_err(|_| HarnessError::WorkerPanicked)?)
    })?;

    let summary = merged.into_inner();
    if let Some(log) = log {
        let mut log = log.lock();
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let outcome = if summary.stats.success == summary.stats.total {
            Outcome::Pass
        } else {
            Outcome::Fail
        };
        log.emit_entry(
            LogEntry::new("", LogLevel::Info, "replay_end")
                .with_platform(policy.platform)
                .with_outcome(outcome)
                .with_duration_ms(duration_ms)
                .with_details(serde_json::json!({
                    "total": summary.stats.total,
                    "success": summary.stats.success,
                    "error": summary.stats.error,
                    "invalid_input": summary.stats.invalid_input(),
                    "workers": summary.workers,
                })),
        )?;
        log.flush()?;
    }
    Ok(summary)
}
