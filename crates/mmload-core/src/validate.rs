//! Policy validation of a decoded [`LoadCommand`].
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. Memory type is RAM or EEPROM
//! 2. Byte count is non-zero and within the per-type limit
//! 3. File name is non-empty, bounded, traversal-free and allow-listed
//! 4. Destination resolves to an absolute address
//! 5. The whole load lands inside one writable, type-matching region
//! 6. The destination is aligned for the platform
//!
//! Structural checks come first so a cheap rejection never pays for a
//! symbol lookup. Acceptance is simulation-only; nothing is written.

use serde::Serialize;

use crate::command::{Destination, LoadCommand};
use crate::error::Rejection;
use crate::policy::{Access, PATH_BOUND, Policy};
use crate::symbol::{PlaceholderSymbolTable, SymbolResolver};

/// Parent-directory tokens refused anywhere in a file name.
pub const TRAVERSAL_TOKENS: [&str; 2] = ["../", "..\\"];

/// A load that passed every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted {
    pub resolved_address: u64,
    pub byte_count: u32,
    pub region: &'static str,
}

/// Validator stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    MemoryType,
    Size,
    FileName,
    AddressResolution,
    RegionContainment,
    Alignment,
}

impl Check {
    pub const ORDER: [Self; 6] = [
        Self::MemoryType,
        Self::Size,
        Self::FileName,
        Self::AddressResolution,
        Self::RegionContainment,
        Self::Alignment,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::MemoryType => "memory type",
            Self::Size => "byte count",
            Self::FileName => "file name",
            Self::AddressResolution => "address resolution",
            Self::RegionContainment => "region containment",
            Self::Alignment => "alignment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

/// Per-stage outcome recorded by [`Validator::validate_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckTrace {
    pub check: Check,
    pub status: CheckStatus,
}

/// Runs the ordered checks against a policy and a symbol collaborator.
#[derive(Debug, Clone)]
pub struct Validator<R> {
    policy: Policy,
    resolver: R,
}

impl Validator<PlaceholderSymbolTable> {
    /// Validator backed by the placeholder symbol table.
    #[must_use]
    pub const fn simulation(policy: Policy) -> Self {
        Self {
            policy,
            resolver: PlaceholderSymbolTable::new(policy),
        }
    }
}

impl<R: SymbolResolver> Validator<R> {
    #[must_use]
    pub const fn new(policy: Policy, resolver: R) -> Self {
        Self { policy, resolver }
    }

    #[must_use]
    pub const fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn validate(&self, cmd: &LoadCommand) -> Result<Accepted, Rejection> {
        self.run(cmd, |_, _| {})
    }

    /// Same verdict as [`Self::validate`], plus the status of every stage.
    pub fn validate_traced(
        &self,
        cmd: &LoadCommand,
    ) -> (Result<Accepted, Rejection>, Vec<CheckTrace>) {
        let mut trace = Vec::with_capacity(Check::ORDER.len());
        let verdict = self.run(cmd, |check, passed| {
            trace.push(CheckTrace {
                check,
                status: if passed {
                    CheckStatus::Pass
                } else {
                    CheckStatus::Fail
                },
            });
        });
        for check in &Check::ORDER[trace.len()..] {
            trace.push(CheckTrace {
                check: *check,
                status: CheckStatus::Skipped,
            });
        }
        (verdict, trace)
    }

    fn run(
        &self,
        cmd: &LoadCommand,
        mut observe: impl FnMut(Check, bool),
    ) -> Result<Accepted, Rejection> {
        // Stage 1: memory type
        observed(&mut observe, Check::MemoryType, self.check_memory_type(cmd))?;

        // Stage 2: size
        observed(&mut observe, Check::Size, self.check_size(cmd))?;

        // Stage 3: file name
        observed(
            &mut observe,
            Check::FileName,
            self.check_file_name(cmd.file_name.as_str()),
        )?;

        // Stage 4: address resolution
        let address = observed(
            &mut observe,
            Check::AddressResolution,
            self.resolve_address(cmd),
        )?;

        // Stage 5: containment + write permission
        let region = observed(
            &mut observe,
            Check::RegionContainment,
            self.policy
                .check_region(address, cmd.byte_count, cmd.memory_type, Access::Write),
        )?;

        // Stage 6: alignment
        observed(&mut observe, Check::Alignment, self.check_alignment(address))?;

        Ok(Accepted {
            resolved_address: address,
            byte_count: cmd.byte_count,
            region: region.name,
        })
    }

    fn check_memory_type(&self, cmd: &LoadCommand) -> Result<(), Rejection> {
        if cmd.memory_type.is_loadable() {
            Ok(())
        } else {
            Err(Rejection::InvalidMemoryType {
                mem_type: cmd.memory_type,
            })
        }
    }

    fn check_size(&self, cmd: &LoadCommand) -> Result<(), Rejection> {
        let max = self.policy.max_for(cmd.memory_type);
        if cmd.byte_count == 0 || cmd.byte_count > max {
            return Err(Rejection::InvalidSize {
                byte_count: cmd.byte_count,
                max,
            });
        }
        Ok(())
    }

    fn check_file_name(&self, file_name: &str) -> Result<(), Rejection> {
        let reject = |detail: &str| {
            Err(Rejection::InvalidFile {
                file_name: file_name.to_string(),
                detail: detail.to_string(),
            })
        };
        if file_name.is_empty() {
            return reject("empty file name");
        }
        if file_name.len() >= PATH_BOUND {
            return reject("file name exceeds path bound");
        }
        if TRAVERSAL_TOKENS
            .iter()
            .any(|token| file_name.contains(token))
        {
            return reject("path traversal");
        }
        if !self.policy.is_allowed_path(file_name) {
            return reject("not under an allowed path");
        }
        Ok(())
    }

    fn resolve_address(&self, cmd: &LoadCommand) -> Result<u64, Rejection> {
        match &cmd.destination {
            Destination::DirectAddress { address } => Ok(*address),
            Destination::Symbol { name, offset } => {
                let base = self.resolver.lookup_symbol(name.as_str()).map_err(|err| {
                    Rejection::SymbolResolutionFailed {
                        symbol: name.to_string(),
                        detail: err.to_string(),
                    }
                })?;
                base.checked_add(*offset)
                    .ok_or(Rejection::InvalidAddress {
                        address: base,
                        byte_count: cmd.byte_count,
                        mem_type: cmd.memory_type,
                    })
            }
        }
    }

    fn check_alignment(&self, address: u64) -> Result<(), Rejection> {
        let alignment = self.policy.alignment();
        if address % alignment != 0 {
            return Err(Rejection::AlignmentError { address, alignment });
        }
        Ok(())
    }
}

fn observed<T>(
    observe: &mut impl FnMut(Check, bool),
    check: Check,
    result: Result<T, Rejection>,
) -> Result<T, Rejection> {
    observe(check, result.is_ok());
    result
}

/// Validate against the default tables and the placeholder symbol table.
pub fn validate(cmd: &LoadCommand, policy: &Policy) -> Result<Accepted, Rejection> {
    Validator::simulation(*policy).validate(cmd)
}
