//! The load-from-file command record.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::policy::{MemType, PATH_BOUND, SYMBOL_NAME_BOUND};

/// MM command message id.
pub const MM_CMD_MID: u16 = 0x1888;
/// Function code of "load memory from file".
pub const MM_LOAD_MEM_FROM_FILE_CC: u8 = 5;
/// Segmentation flags of an unsegmented packet.
pub const SEG_FLAGS_COMPLETE: u8 = 0b11;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("name of {len} bytes does not fit a {bound}-byte field")]
pub struct BoundError {
    pub len: usize,
    pub bound: usize,
}

/// String that fits a fixed `BOUND`-byte flight-software field, terminator
/// included, so at most `BOUND - 1` bytes of text.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BoundedStr<const BOUND: usize>(String);

/// Symbol name field (at most 19 bytes).
pub type SymbolName = BoundedStr<SYMBOL_NAME_BOUND>;
/// File name field (at most 63 bytes).
pub type FileName = BoundedStr<PATH_BOUND>;

impl<const BOUND: usize> BoundedStr<BOUND> {
    pub fn new(value: impl Into<String>) -> Result<Self, BoundError> {
        let value = value.into();
        if value.len() >= BOUND {
            return Err(BoundError {
                len: value.len(),
                bound: BOUND,
            });
        }
        Ok(Self(value))
    }

    /// Copy at most `BOUND - 1` bytes of `value`, cutting on a char boundary.
    #[must_use]
    pub fn truncating(value: &str) -> Self {
        let mut end = value.len().min(BOUND - 1);
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        Self(value[..end].to_string())
    }

    /// Concatenate `suffix` if the result still fits, otherwise keep `self`.
    #[must_use]
    pub fn with_suffix_if_fits(self, suffix: &str) -> Self {
        let remaining = BOUND - self.0.len() - 1;
        if remaining > suffix.len() {
            Self(self.0 + suffix)
        } else {
            self
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const BOUND: usize> fmt::Debug for BoundedStr<BOUND> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl<const BOUND: usize> fmt::Display for BoundedStr<BOUND> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the loaded bytes go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Destination {
    /// Resolved through the symbol table, then offset.
    Symbol { name: SymbolName, offset: u64 },
    /// Absolute address.
    DirectAddress { address: u64 },
}

/// Command header the decoder synthesizes for every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommandHeader {
    pub msg_id: u16,
    pub function_code: u8,
    pub sequence_count: u16,
    pub segmentation_flags: u8,
}

impl CommandHeader {
    #[must_use]
    pub const fn load_from_file() -> Self {
        Self {
            msg_id: MM_CMD_MID,
            function_code: MM_LOAD_MEM_FROM_FILE_CC,
            sequence_count: 0,
            segmentation_flags: SEG_FLAGS_COMPLETE,
        }
    }
}

/// One decoded "load memory from file" command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadCommand {
    pub header: CommandHeader,
    pub memory_type: MemType,
    pub byte_count: u32,
    /// Carried verbatim; never checked against file contents.
    pub checksum: u32,
    pub destination: Destination,
    pub file_name: FileName,
}

impl LoadCommand {
    /// Record with a synthesized header and no checksum.
    #[must_use]
    pub fn new(
        memory_type: MemType,
        byte_count: u32,
        destination: Destination,
        file_name: FileName,
    ) -> Self {
        Self {
            header: CommandHeader::load_from_file(),
            memory_type,
            byte_count,
            checksum: 0,
            destination,
            file_name,
        }
    }
}
