//! Fuzz-cycle counters.
//!
//! Counters are owned by a session (one per worker) and only ever grow.
//! Workers report [`StatsSnapshot`]s, which merge associatively.

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Outcome class of one fuzz cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FuzzResult {
    /// Decoded and accepted.
    Success,
    /// Decoded, then rejected by the validator.
    Error,
    Crash,
    Timeout,
    /// Refused by the decoder. Counted in `total` only.
    InvalidInput,
}

/// Per-session counters.
#[derive(Debug, Clone)]
pub struct FuzzStats {
    total: u64,
    success: u64,
    error: u64,
    crash: u64,
    timeout: u64,
    started: Instant,
}

impl FuzzStats {
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: 0,
            success: 0,
            error: 0,
            crash: 0,
            timeout: 0,
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, result: FuzzResult) {
        self.total += 1;
        match result {
            FuzzResult::Success => self.success += 1,
            FuzzResult::Error => self.error += 1,
            FuzzResult::Crash => self.crash += 1,
            FuzzResult::Timeout => self.timeout += 1,
            FuzzResult::InvalidInput => {}
        }
    }

    /// Zero every counter and restart the clock.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total: self.total,
            success: self.success,
            error: self.error,
            crash: self.crash,
            timeout: self.timeout,
            elapsed_ms: duration_ms(self.started.elapsed()),
        }
    }
}

impl Default for FuzzStats {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Point-in-time copy of a session's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub total: u64,
    pub success: u64,
    pub error: u64,
    pub crash: u64,
    pub timeout: u64,
    pub elapsed_ms: u64,
}

impl StatsSnapshot {
    /// Combine two workers' snapshots. Counters add; workers run
    /// concurrently, so elapsed time is the longer of the two.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            success: self.success + other.success,
            error: self.error + other.error,
            crash: self.crash + other.crash,
            timeout: self.timeout + other.timeout,
            elapsed_ms: self.elapsed_ms.max(other.elapsed_ms),
        }
    }

    /// Decoder refusals: cycles counted in `total` and nowhere else.
    #[must_use]
    pub fn invalid_input(&self) -> u64 {
        self.total
            .saturating_sub(self.success + self.error + self.crash + self.timeout)
    }

    /// `count` as a percentage of `total`, 0 when nothing ran.
    #[must_use]
    pub fn percent(&self, count: u64) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        100.0 * count as f64 / self.total as f64
    }

    /// Executions per second, 0 before the first millisecond.
    #[must_use]
    pub fn exec_per_sec(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        self.total as f64 * 1000.0 / self.elapsed_ms as f64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== MM Load Fuzzing Statistics ===")?;
        writeln!(f, "Total Executions: {}", self.total)?;
        for (label, count) in [
            ("Successful", self.success),
            ("Errors", self.error),
            ("Crashes", self.crash),
            ("Timeouts", self.timeout),
        ] {
            writeln!(f, "{label}: {count} ({:.2}%)", self.percent(count))?;
        }
        writeln!(f, "Elapsed Time: {:.3} seconds", self.elapsed_ms as f64 / 1000.0)?;
        writeln!(f, "Execution Rate: {:.2} exec/sec", self.exec_per_sec())?;
        write!(f, "==================================")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let snap = FuzzStats::new().snapshot();
        assert_eq!(snap.total, 0);
        assert_eq!(snap.percent(0), 0.0);
    }

    #[test]
    fn invalid_input_counts_only_toward_total() {
        let mut stats = FuzzStats::new();
        stats.record(FuzzResult::Success);
        stats.record(FuzzResult::Error);
        stats.record(FuzzResult::Error);
        stats.record(FuzzResult::InvalidInput);
        let snap = stats.snapshot();
        assert_eq!(snap.total, 4);
        assert_eq!(snap.success, 1);
        assert_eq!(snap.error, 2);
        assert_eq!(snap.invalid_input(), 1);
        assert!((snap.percent(snap.error) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_zeroes_counters() {
        let mut stats = FuzzStats::new();
        stats.record(FuzzResult::Crash);
        stats.reset();
        assert_eq!(stats.total(), 0);
        assert_eq!(stats.snapshot().crash, 0);
    }

    #[test]
    fn merge_adds_counts_and_keeps_longest_run() {
        let a = StatsSnapshot {
            total: 3,
            success: 1,
            error: 2,
            elapsed_ms: 400,
            ..StatsSnapshot::default()
        };
        let b = StatsSnapshot {
            total: 5,
            timeout: 1,
            error: 4,
            elapsed_ms: 900,
            ..StatsSnapshot::default()
        };
        let c = StatsSnapshot {
            total: 1,
            crash: 1,
            elapsed_ms: 100,
            ..StatsSnapshot::default()
        };
        let merged = a.merge(b).merge(c);
        assert_eq!(merged, a.merge(b.merge(c)));
        assert_eq!(merged.total, 9);
        assert_eq!(merged.error, 6);
        assert_eq!(merged.elapsed_ms, 900);
        assert!((merged.exec_per_sec() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn summary_lists_every_counter() {
        let snap = StatsSnapshot {
            total: 4,
            success: 1,
            error: 3,
            elapsed_ms: 2000,
            ..StatsSnapshot::default()
        };
        let text = snap.to_string();
        assert!(text.contains("Total Executions: 4"));
        assert!(text.contains("Successful: 1 (25.00%)"));
        assert!(text.contains("Errors: 3 (75.00%)"));
        assert!(text.contains("Crashes: 0 (0.00%)"));
        assert!(text.contains("Execution Rate: 2.00 exec/sec"));
    }
}
