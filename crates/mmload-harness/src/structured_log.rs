//! Structured JSONL logging for smoke and replay runs.
//!
//! Provides:
//! - [`LogEntry`]: one JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file, numbering trace ids.
//! - [`validate_log_line`]: checks a single JSONL line against the schema.
//! - [`validate_log_file`]: checks an entire JSONL file.

use std::io::Write;
use std::path::Path;

use mmload_core::{CycleOutcome, Rejection, TargetPlatform};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Rejection kinds accepted by the validator below.
const REJECTION_KINDS: [&str; 8] = [
    "invalid_memory_type",
    "invalid_size",
    "invalid_data_size",
    "invalid_file",
    "symbol_resolution_failed",
    "invalid_address",
    "permission_denied",
    "alignment_error",
];

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
}

/// Cycle outcome as recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Decoded and accepted.
    Pass,
    /// Decoded and rejected.
    Fail,
    /// Refused by the decoder.
    Skip,
}

impl Outcome {
    #[must_use]
    pub const fn of(cycle: &CycleOutcome) -> Self {
        match cycle {
            CycleOutcome::Accepted { .. } => Self::Pass,
            CycleOutcome::Rejected { .. } => Self::Fail,
            CycleOutcome::InvalidInput(_) => Self::Skip,
        }
    }
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<TargetPlatform>,
    /// Hex SHA-256 of the raw input bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ns: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            campaign: None,
            platform: None,
            input_sha256: None,
            input_len: None,
            outcome: None,
            rejection: None,
            status_code: None,
            latency_ns: None,
            duration_ms: None,
            details: None,
        }
    }

    /// Entry describing one decode/validate cycle.
    #[must_use]
    pub fn for_cycle(trace_id: impl Into<String>, input: &[u8], cycle: &CycleOutcome) -> Self {
        let level = match cycle {
            CycleOutcome::Accepted { .. } => LogLevel::Info,
            CycleOutcome::Rejected { .. } => LogLevel::Warn,
            CycleOutcome::InvalidInput(_) => LogLevel::Debug,
        };
        let mut entry = Self::new(trace_id, level, "fuzz_cycle")
            .with_input(input)
            .with_outcome(Outcome::of(cycle));
        if let Some(code) = cycle.status_code() {
            entry = entry.with_status_code(code);
        }
        match cycle {
            CycleOutcome::Rejected { rejection, .. } => entry.with_rejection(rejection),
            CycleOutcome::Accepted { accepted, .. } => {
                entry.with_details(serde_json::json!({ "accepted": accepted }))
            }
            CycleOutcome::InvalidInput(err) => {
                entry.with_details(serde_json::json!({ "decode_error": err.to_string() }))
            }
        }
    }

    #[must_use]
    pub fn with_campaign(mut self, campaign: impl Into<String>) -> Self {
        self.campaign = Some(campaign.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: TargetPlatform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Record the digest and length of the raw input.
    #[must_use]
    pub fn with_input(mut self, input: &[u8]) -> Self {
        self.input_sha256 = Some(sha256_hex(input));
        self.input_len = Some(input.len());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set rejection kind and status code, with the full rejection as details.
    #[must_use]
    pub fn with_rejection(mut self, rejection: &Rejection) -> Self {
        self.rejection = Some(rejection.kind().to_string());
        self.status_code = Some(rejection.code());
        self.details = serde_json::to_value(rejection).ok();
        self
    }

    #[must_use]
    pub fn with_status_code(mut self, code: i32) -> Self {
        self.status_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_latency_ns(mut self, ns: u64) -> Self {
        self.latency_ns = Some(ns);
        self
    }

    /// Wall time of a whole run.
    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex_lower(&Sha256::digest(bytes))
}

fn hex_lower(bytes: &[u8]) -> String {
    use std::fmt::Write as _;
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Writes structured JSONL log entries.
///
/// Trace ids follow `<campaign>::<run_id>::<seq>`. The writer is `Send` so a
/// replay can share one emitter between workers behind a mutex.
pub struct LogEmitter {
    writer: Box<dyn Write + Send>,
    seq: u64,
    campaign: String,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, campaign: &str, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::to_writer(
            std::io::BufWriter::new(file),
            campaign,
            run_id,
        ))
    }

    /// Create an emitter over any writer.
    #[must_use]
    pub fn to_writer(writer: impl Write + Send + 'static, campaign: &str, run_id: &str) -> Self {
        Self {
            writer: Box::new(writer),
            seq: 0,
            campaign: campaign.to_string(),
            run_id: run_id.to_string(),
        }
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{}::{:03}", self.campaign, self.run_id, self.seq)
    }

    /// Emit a bare event with an auto-generated trace id.
    pub fn emit(&mut self, level: LogLevel, event: &str) -> std::io::Result<LogEntry> {
        let trace_id = self.next_trace_id();
        let entry = LogEntry::new(&trace_id, level, event).with_campaign(&self.campaign);
        self.write_line(&entry)?;
        Ok(entry)
    }

    /// Emit a fully-populated entry, filling trace id and campaign if unset.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        if entry.campaign.is_none() {
            entry.campaign = Some(self.campaign.clone());
        }
        self.write_line(&entry)
    }

    /// Emit one cycle record.
    pub fn emit_cycle(
        &mut self,
        input: &[u8],
        cycle: &CycleOutcome,
        platform: TargetPlatform,
        latency_ns: u64,
    ) -> std::io::Result<()> {
        let entry = LogEntry::for_cycle("", input, cycle)
            .with_platform(platform)
            .with_latency_ns(latency_ns);
        self.emit_entry(entry)
    }

    fn write_line(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = serde_json::to_string(entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            fail("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };

    let Some(obj) = value.as_object() else {
        fail("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            fail(field, "required field missing".to_string());
        }
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !["debug", "info", "warn"].contains(&level)
    {
        fail("level", format!("invalid level: '{level}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !["pass", "fail", "skip"].contains(&outcome)
    {
        fail("outcome", format!("invalid outcome: '{outcome}'"));
    }

    // A rejection must name a known kind and carry its negative status code.
    if let Some(kind) = obj.get("rejection").and_then(|v| v.as_str()) {
        if !REJECTION_KINDS.contains(&kind) {
            fail("rejection", format!("unknown rejection kind: '{kind}'"));
        }
        match obj.get("status_code").and_then(serde_json::Value::as_i64) {
            Some(code) if code < 0 => {}
            Some(code) => fail(
                "status_code",
                format!("rejections need a negative status code, got {code}"),
            ),
            None => fail(
                "status_code",
                "rejection events must include status_code".to_string(),
            ),
        }
    }

    if let Some(digest) = obj.get("input_sha256").and_then(|v| v.as_str())
        && (digest.len() != 64 || !digest.bytes().all(|b| b.is_ascii_hexdigit()))
    {
        fail(
            "input_sha256",
            format!("expected 64 hex chars, got '{digest}'"),
        );
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        fail(
            "trace_id",
            format!("trace_id should follow <campaign>::<run_id>::<seq> format, got: '{trace_id}'"),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    serde_json::from_value::<LogEntry>(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<deserialization>".to_string(),
            message: format!("failed to deserialize: {e}"),
        }]
    })
}

/// Validate an entire JSONL file.
///
/// Returns the non-empty line count and any validation errors found.
pub fn validate_log_file(path: &Path) -> Result<(usize, Vec<LogValidationError>), std::io::Error> {
    let content = std::fs::read_to_string(path)?;
    let mut all_errors = Vec::new();
    let mut line_count = 0;

    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        line_count += 1;
        if let Err(errs) = validate_log_line(line, i + 1) {
            all_errors.extend(errs);
        }
    }

    Ok((line_count, all_errors))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// RFC 3339 UTC timestamp with millisecond precision.
#[must_use]
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

/// Days since 1970-01-01 to a proleptic Gregorian date.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmload_core::{DecodeError, FuzzSession, Policy};

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("smoke::run-1::001", LogLevel::Info, "smoke_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "smoke::run-1::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "smoke_start");
        assert!(parsed.get("campaign").is_none());
        assert!(parsed.get("rejection").is_none());
    }

    #[test]
    fn cycle_entry_carries_rejection_and_digest() {
        let mut session = FuzzSession::new(Policy::default());
        let input = [0x01, 0x00, 0x10, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78, 0x00, 0x02, 0x01];
        let cycle = session.run_one(&input);
        let entry = LogEntry::for_cycle("replay::r::001", &input, &cycle);
        assert_eq!(entry.level, LogLevel::Warn);
        assert_eq!(entry.outcome, Some(Outcome::Fail));
        assert_eq!(entry.rejection.as_deref(), Some("invalid_address"));
        assert_eq!(entry.status_code, Some(-3));
        assert_eq!(entry.input_len, Some(12));
        assert_eq!(entry.input_sha256.as_deref().map(str::len), Some(64));
        let line = entry.to_jsonl().unwrap();
        assert!(validate_log_line(&line, 1).is_ok(), "{line}");
    }

    #[test]
    fn short_input_entry_is_skip() {
        let cycle = CycleOutcome::InvalidInput(DecodeError::TooShort { len: 0, min: 9 });
        let entry = LogEntry::for_cycle("replay::r::002", &[], &cycle);
        assert_eq!(entry.outcome, Some(Outcome::Skip));
        assert_eq!(entry.status_code, None);
        assert_eq!(entry.level, LogLevel::Debug);
    }

    #[test]
    fn sha256_of_empty_input() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn validator_flags_bad_fields() {
        let line = r#"{"timestamp":"t","trace_id":"nodelim","level":"loud","event":"e","outcome":"maybe"}"#;
        let errs = validate_log_line(line, 7).unwrap_err();
        let fields: Vec<_> = errs.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"trace_id"));
        assert!(fields.contains(&"level"));
        assert!(fields.contains(&"outcome"));
        assert!(errs.iter().all(|e| e.line_number == 7));
    }

    #[test]
    fn validator_requires_status_code_with_rejection() {
        let line = r#"{"timestamp":"t","trace_id":"a::b::001","level":"warn","event":"fuzz_cycle","rejection":"invalid_size"}"#;
        let errs = validate_log_line(line, 1).unwrap_err();
        assert_eq!(errs[0].field, "status_code");

        let line = r#"{"timestamp":"t","trace_id":"a::b::001","level":"warn","event":"fuzz_cycle","rejection":"made_up","status_code":-2}"#;
        let errs = validate_log_line(line, 1).unwrap_err();
        assert_eq!(errs[0].field, "rejection");
    }

    #[test]
    fn missing_required_fields_reported() {
        let errs = validate_log_line(r#"{"event":"x"}"#, 1).unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(validate_log_line("not json", 1).is_err());
        assert!(validate_log_line("[1,2]", 1).is_err());
    }

    #[test]
    fn utc_formatting() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        // 2000-03-01 00:00:00 UTC, just past a leap day.
        assert_eq!(format_utc(951_868_800, 5), "2000-03-01T00:00:00.005Z");
        // 2024-12-31 23:59:59 UTC.
        assert_eq!(format_utc(1_735_689_599, 999), "2024-12-31T23:59:59.999Z");
    }
}
