//! Fuzz-input decoder and policy validator for the Memory Manager
//! "load memory from file" command.
//!
//! Arbitrary bytes are mapped onto a structurally valid command record, which
//! is then re-checked against a static memory-region policy before it would be
//! handed to a real memory write. Nothing is ever written.
//!
//! # Architecture
//!
//! - **Policy tables** (`policy`): regions, symbols, path prefixes, size limits
//! - **Platform profiles** (`platform`): per-target base addresses and alignment
//! - **Command record** (`command`): bounded names, destination, header
//! - **Decoder** (`decode`): greedy byte cursor with per-field defaults
//! - **Validator** (`validate`): ordered, short-circuiting checks
//! - **Symbol collaborator** (`symbol`): `name -> address` lookup seam
//! - **Statistics** (`stats`) and **sessions** (`session`): per-worker cycle counts

#![forbid(unsafe_code)]

pub mod command;
pub mod decode;
pub mod error;
pub mod platform;
pub mod policy;
pub mod session;
pub mod stats;
pub mod symbol;
pub mod validate;

pub use command::{Destination, FileName, LoadCommand, SymbolName};
pub use decode::{MIN_INPUT_LEN, decode};
pub use error::{DecodeError, Rejection, SymbolError};
pub use platform::{TargetPlatform, target_platform};
pub use policy::{Access, MemType, MemoryRegion, Policy};
pub use session::{CycleOutcome, FuzzSession};
pub use stats::{FuzzResult, FuzzStats, StatsSnapshot};
pub use symbol::{PlaceholderSymbolTable, SymbolResolver};
pub use validate::{Accepted, Check, CheckStatus, CheckTrace, Validator, validate};
