//! Standalone smoke run: one fixed well-formed input, then a short sweep of
//! memory-type variations.

use std::fmt::Write as _;

use mmload_core::{FuzzResult, FuzzSession, Policy, StatsSnapshot, Validator};
use serde::Serialize;

use crate::report::CycleReport;
use crate::structured_log::LogEmitter;

/// EEPROM load of `CFE_EVS_Global` from `/cf/download/testfile.bin`.
pub const SMOKE_INPUT: [u8; 12] = [
    0x01, // memory type
    0x00, 0x10, 0x00, 0x00, // byte count
    0x12, 0x34, 0x56, 0x78, // checksum
    0x00, // symbol destination
    0x02, // symbol seed
    0x01, // path seed
];

pub const DEFAULT_ITERATIONS: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Iteration {
    pub index: usize,
    pub mem_type_byte: u8,
    pub result: FuzzResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SmokeRun {
    pub report: CycleReport,
    pub iterations: Vec<Iteration>,
    pub stats: StatsSnapshot,
}

impl SmokeRun {
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = self.report.to_text();
        out.push_str("\nRunning multiple iterations...\n");
        for it in &self.iterations {
            let verdict = if it.result == FuzzResult::Success {
                "PASS"
            } else {
                "FAIL"
            };
            let _ = writeln!(
                out,
                "  Iteration {} (type byte {}): {verdict}",
                it.index + 1,
                it.mem_type_byte
            );
        }
        out
    }
}

/// Run the fixed input once with a check-by-check report, then `iterations`
/// variations with the leading byte set to `i % 2 + 1`. Every cycle is
/// logged when an emitter is given.
pub fn run_smoke(
    policy: Policy,
    iterations: usize,
    mut log: Option<&mut LogEmitter>,
) -> std::io::Result<SmokeRun> {
    let report = CycleReport::build(&SMOKE_INPUT, &Validator::simulation(policy));

    let mut session = FuzzSession::new(policy);
    let mut results = Vec::with_capacity(iterations);
    let mut input = SMOKE_INPUT;
    for index in 0..iterations {
        // Only the type byte varies.
        input[0] = (index % 2) as u8 + 1;
        let started = std::time::Instant::now();
        let cycle = session.run_one(&input);
        let latency_ns = u64::try_from(started.elapsed().as_nanos()).unwrap_or(u64::MAX);
        if let Some(emitter) = log.as_deref_mut() {
            emitter.emit_cycle(&input, &cycle, policy.platform, latency_ns)?;
        }
        results.push(Iteration {
            index,
            mem_type_byte: input[0],
            result: cycle.result(),
            status_code: cycle.status_code(),
        });
    }

    Ok(SmokeRun {
        report,
        iterations: results,
        stats: session.snapshot(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoke_alternates_memory_types() {
        let run = run_smoke(Policy::default(), DEFAULT_ITERATIONS, None).unwrap();
        assert_eq!(run.iterations.len(), 10);
        assert_eq!(run.stats.total, 10);
        let bytes: Vec<_> = run.iterations.iter().map(|i| i.mem_type_byte).collect();
        assert_eq!(bytes, vec![1, 2, 1, 2, 1, 2, 1, 2, 1, 2]);
        // The RAM variant resolves CFE_EVS_Global into SRAM_MAIN; the EEPROM
        // variant cannot land there.
        assert_eq!(run.iterations[0].status_code, Some(-3));
        assert_eq!(run.iterations[1].result, FuzzResult::Success);
        assert_eq!(run.stats.success, 5);
        assert_eq!(run.stats.error, 5);
    }

    #[test]
    fn smoke_report_names_fixed_record() {
        let run = run_smoke(Policy::default(), 2, None).unwrap();
        let text = run.to_text();
        assert!(text.contains("Symbol: CFE_EVS_Global"), "{text}");
        assert!(text.contains("Iteration 2 (type byte 2)"), "{text}");
    }
}
