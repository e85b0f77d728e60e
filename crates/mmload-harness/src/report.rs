//! Human-readable and machine-readable run reports.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

use mmload_core::{
    CheckStatus, CheckTrace, Destination, LoadCommand, Rejection, StatsSnapshot, SymbolResolver,
    TargetPlatform, Validator, decode,
};
use serde::Serialize;

use crate::corpus::HarnessError;
use crate::structured_log::now_utc;

// ---------------------------------------------------------------------------
// Statistics report
// ---------------------------------------------------------------------------

/// Aggregate statistics of a smoke or replay run.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub title: String,
    pub platform: TargetPlatform,
    pub timestamp: String,
    pub stats: StatsSnapshot,
    pub exec_per_sec: f64,
    /// Rejection counts keyed by [`Rejection::kind`].
    pub rejections: BTreeMap<String, u64>,
}

impl StatsReport {
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        platform: TargetPlatform,
        stats: StatsSnapshot,
        rejections: BTreeMap<String, u64>,
    ) -> Self {
        Self {
            title: title.into(),
            platform,
            timestamp: now_utc(),
            exec_per_sec: stats.exec_per_sec(),
            stats,
            rejections,
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let s = &self.stats;
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "- Platform: {}", self.platform.name());
        let _ = writeln!(out, "- Timestamp: {}", self.timestamp);
        let _ = writeln!(out, "- Elapsed: {} ms", s.elapsed_ms);
        let _ = writeln!(out, "- Rate: {:.2} exec/sec\n", self.exec_per_sec);

        out.push_str("| Result | Count | Share |\n");
        out.push_str("|--------|-------|-------|\n");
        for (label, count) in [
            ("total", s.total),
            ("success", s.success),
            ("error", s.error),
            ("crash", s.crash),
            ("timeout", s.timeout),
            ("invalid input", s.invalid_input()),
        ] {
            let _ = writeln!(out, "| {label} | {count} | {:.2}% |", s.percent(count));
        }

        if !self.rejections.is_empty() {
            out.push_str("\n| Rejection | Count |\n");
            out.push_str("|-----------|-------|\n");
            for (kind, count) in &self.rejections {
                let _ = writeln!(out, "| {kind} | {count} |");
            }
        }
        out
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the markdown report to `path` and the JSON report next to it
    /// with a `.json` extension.
    pub fn write_to(&self, path: &Path) -> Result<(), HarnessError> {
        let json = self.to_json()?;
        std::fs::write(path, self.to_markdown())?;
        std::fs::write(path.with_extension("json"), json)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Single-cycle report
// ---------------------------------------------------------------------------

/// Everything one decode/validate pass produced, check by check.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub input_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decode_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<LoadCommand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_address: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<&'static str>,
    pub checks: Vec<CheckTrace>,
}

impl CycleReport {
    /// Decode `input` and validate it with per-check tracing.
    #[must_use]
    pub fn build<R: SymbolResolver>(input: &[u8], validator: &Validator<R>) -> Self {
        let mut report = Self {
            input_len: input.len(),
            decode_error: None,
            command: None,
            rejection: None,
            status_code: None,
            resolved_address: None,
            region: None,
            checks: Vec::new(),
        };
        let command = match decode(input, validator.policy()) {
            Ok(command) => command,
            Err(err) => {
                report.decode_error = Some(err.to_string());
                return report;
            }
        };
        let (verdict, checks) = validator.validate_traced(&command);
        report.checks = checks;
        match verdict {
            Ok(accepted) => {
                report.status_code = Some(mmload_core::error::STATUS_SUCCESS);
                report.resolved_address = Some(accepted.resolved_address);
                report.region = Some(accepted.region);
            }
            Err(rejection) => {
                report.status_code = Some(rejection.code());
                report.rejection = Some(rejection);
            }
        }
        report.command = Some(command);
        report
    }

    #[must_use]
    pub fn accepted(&self) -> bool {
        self.status_code == Some(mmload_core::error::STATUS_SUCCESS)
    }

    /// Plain-text rendering for terminals.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Input size: {} bytes", self.input_len);
        if let Some(err) = &self.decode_error {
            let _ = writeln!(out, "Decode failed: {err}");
            return out;
        }
        if let Some(cmd) = &self.command {
            out.push_str("Command decoded:\n");
            let _ = writeln!(out, "  MemType: {:?} ({})", cmd.memory_type, cmd.memory_type.raw());
            let _ = writeln!(out, "  ByteCount: {}", cmd.byte_count);
            let _ = writeln!(out, "  Checksum: 0x{:08X}", cmd.checksum);
            match &cmd.destination {
                Destination::Symbol { name, offset } => {
                    let _ = writeln!(out, "  Symbol: {name}");
                    let _ = writeln!(out, "  Offset: 0x{offset:x}");
                }
                Destination::DirectAddress { address } => {
                    let _ = writeln!(out, "  Address: 0x{address:08X}");
                }
            }
            let _ = writeln!(out, "  FileName: {}", cmd.file_name);
        }
        out.push_str("Checks:\n");
        for trace in &self.checks {
            let status = match trace.status {
                CheckStatus::Pass => "PASS",
                CheckStatus::Fail => "FAIL",
                CheckStatus::Skipped => "SKIP",
            };
            let _ = writeln!(out, "  [{status}] {}", trace.check.label());
        }
        match (&self.rejection, self.region) {
            (Some(rejection), _) => {
                let _ = writeln!(out, "Result: {} ({rejection})", rejection.code());
            }
            (None, Some(region)) => {
                let _ = writeln!(
                    out,
                    "Result: 0 (accepted into {region} at 0x{:08X})",
                    self.resolved_address.unwrap_or_default()
                );
            }
            (None, None) => {}
        }
        out
    }

    /// Pretty JSON rendering.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmload_core::{Check, Policy, StatsSnapshot};

    #[test]
    fn markdown_lists_counts_and_rejections() {
        let stats = StatsSnapshot {
            total: 10,
            success: 2,
            error: 7,
            elapsed_ms: 1000,
            ..StatsSnapshot::default()
        };
        let mut rejections = BTreeMap::new();
        rejections.insert("invalid_address".to_string(), 5);
        rejections.insert("alignment_error".to_string(), 2);
        let report = StatsReport::new("Replay", TargetPlatform::Simulation, stats, rejections);
        let md = report.to_markdown();
        assert!(md.starts_with("# Replay\n"));
        assert!(md.contains("- Platform: simulation"));
        assert!(md.contains("| success | 2 | 20.00% |"));
        assert!(md.contains("| invalid input | 1 | 10.00% |"));
        assert!(md.contains("| invalid_address | 5 |"));
        // BTreeMap keeps rejection rows sorted.
        assert!(md.find("alignment_error").unwrap() < md.find("invalid_address").unwrap());

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["stats"]["total"], 10);
        assert_eq!(json["platform"], "simulation");
        assert_eq!(json["exec_per_sec"], 10.0);
    }

    #[test]
    fn cycle_report_of_short_input() {
        let v = Validator::simulation(Policy::default());
        let report = CycleReport::build(&[1, 2, 3], &v);
        assert!(report.decode_error.is_some());
        assert!(report.checks.is_empty());
        assert!(!report.accepted());
        assert!(report.to_text().contains("Decode failed"));
    }

    #[test]
    fn cycle_report_traces_checks() {
        let v = Validator::simulation(Policy::default());
        let input = [0x01, 0x00, 0x10, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78, 0x00, 0x02, 0x01];
        let report = CycleReport::build(&input, &v);
        assert_eq!(report.status_code, Some(-3));
        assert_eq!(report.checks.len(), Check::ORDER.len());
        let text = report.to_text();
        assert!(text.contains("Symbol: CFE_EVS_Global"), "{text}");
        assert!(text.contains("FileName: /cf/download/testfile.bin"), "{text}");
        assert!(text.contains("[FAIL] region containment"), "{text}");
        assert!(text.contains("[SKIP] alignment"), "{text}");

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["rejection"]["reason"], "invalid_address");
        assert_eq!(json["command"]["destination"]["kind"], "symbol");
    }

    #[test]
    fn write_to_emits_markdown_and_json_pair() {
        let dir = std::env::temp_dir().join("mmload_report_write_unit");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("replay.md");
        let report = StatsReport::new(
            "Write",
            TargetPlatform::Simulation,
            StatsSnapshot::default(),
            BTreeMap::new(),
        );
        report.write_to(&path).unwrap();

        let md = std::fs::read_to_string(&path).unwrap();
        assert!(md.starts_with("# Write"));
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("replay.json")).unwrap())
                .unwrap();
        assert_eq!(json["title"], "Write");
    }

    #[test]
    fn write_to_missing_directory_is_io_error() {
        let path = std::env::temp_dir()
            .join("mmload_report_missing_dir_unit")
            .join("nested")
            .join("r.md");
        let _ = std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap());
        let report = StatsReport::new(
            "Missing",
            TargetPlatform::Simulation,
            StatsSnapshot::default(),
            BTreeMap::new(),
        );
        assert!(matches!(report.write_to(&path), Err(HarnessError::Io(_))));
    }
}
