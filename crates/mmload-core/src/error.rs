//! Error taxonomy for the decode and validate stages.
//!
//! Nothing here is fatal: every error is handed back to the caller of the
//! cycle that produced it.

use serde::Serialize;
use thiserror::Error;

use crate::policy::MemType;

/// Status code reported for a successful command.
pub const STATUS_SUCCESS: i32 = 0;

/// Decoder failure. The decoder has exactly one hard precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("input of {len} bytes is shorter than the {min}-byte minimum record")]
    TooShort { len: usize, min: usize },
}

/// Failure reported by a [`crate::SymbolResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SymbolError {
    #[error("symbol '{0}' not found")]
    NotFound(String),
    #[error("symbol name is empty")]
    EmptyName,
}

/// Validator rejection. Each variant carries the offending value.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("invalid memory type {mem_type:?} for a file load")]
    InvalidMemoryType { mem_type: MemType },
    #[error("invalid size {byte_count} (limit {max})")]
    InvalidSize { byte_count: u32, max: u32 },
    #[error("invalid data size {bits} (expected 8, 16 or 32 bits)")]
    InvalidDataSize { bits: u8 },
    #[error("invalid file name '{file_name}': {detail}")]
    InvalidFile { file_name: String, detail: String },
    #[error("symbol resolution failed for '{symbol}': {detail}")]
    SymbolResolutionFailed { symbol: String, detail: String },
    #[error("no {mem_type:?} region contains {address:#010x}..+{byte_count}")]
    InvalidAddress {
        address: u64,
        byte_count: u32,
        mem_type: MemType,
    },
    #[error("region {region} is read-only ({address:#010x})")]
    PermissionDenied { address: u64, region: String },
    #[error("address {address:#010x} is not {alignment}-byte aligned")]
    AlignmentError { address: u64, alignment: u64 },
}

impl Rejection {
    /// Flight-software status code for this rejection.
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::InvalidMemoryType { .. } => -1,
            Self::InvalidSize { .. } | Self::InvalidDataSize { .. } => -2,
            Self::InvalidAddress { .. } => -3,
            Self::InvalidFile { .. } => -4,
            Self::AlignmentError { .. } => -9,
            Self::PermissionDenied { .. } => -10,
            // OS_ERROR from the OSAL symbol lookup.
            Self::SymbolResolutionFailed { .. } => -1,
        }
    }

    /// Short stable name, used as a log/report key.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InvalidMemoryType { .. } => "invalid_memory_type",
            Self::InvalidSize { .. } => "invalid_size",
            Self::InvalidDataSize { .. } => "invalid_data_size",
            Self::InvalidFile { .. } => "invalid_file",
            Self::SymbolResolutionFailed { .. } => "symbol_resolution_failed",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::AlignmentError { .. } => "alignment_error",
        }
    }
}
