//! Symbol-resolution collaborator.
//!
//! The real symbol table lives in the flight OS abstraction layer. The
//! validator only needs `name -> address`, so it talks to a [`SymbolResolver`]
//! and the simulation plugs in [`PlaceholderSymbolTable`].

use crate::error::SymbolError;
use crate::policy::Policy;

/// Spacing between placeholder symbol addresses.
pub const PLACEHOLDER_STRIDE: u64 = 0x1000;

/// Resolves symbol names to absolute addresses.
pub trait SymbolResolver {
    fn lookup_symbol(&self, name: &str) -> Result<u64, SymbolError>;
}

impl<R: SymbolResolver + ?Sized> SymbolResolver for &R {
    fn lookup_symbol(&self, name: &str) -> Result<u64, SymbolError> {
        (**self).lookup_symbol(name)
    }
}

/// Deterministic stand-in: `ram_base + len(name) * 0x1000` for every name in
/// the policy's symbol table, `NotFound` for anything else.
#[derive(Debug, Clone, Copy)]
pub struct PlaceholderSymbolTable {
    policy: Policy,
}

impl PlaceholderSymbolTable {
    #[must_use]
    pub const fn new(policy: Policy) -> Self {
        Self { policy }
    }
}

impl SymbolResolver for PlaceholderSymbolTable {
    fn lookup_symbol(&self, name: &str) -> Result<u64, SymbolError> {
        if name.is_empty() {
            return Err(SymbolError::EmptyName);
        }
        if !self.policy.is_known_symbol(name) {
            return Err(SymbolError::NotFound(name.to_string()));
        }
        Ok(self.policy.platform.ram_base() + name.len() as u64 * PLACEHOLDER_STRIDE)
    }
}
