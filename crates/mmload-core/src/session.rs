//! One decode-then-validate cycle per input, with statistics.

use crate::command::LoadCommand;
use crate::decode::decode;
use crate::error::{DecodeError, Rejection, STATUS_SUCCESS};
use crate::policy::Policy;
use crate::stats::{FuzzResult, FuzzStats, StatsSnapshot};
use crate::symbol::{PlaceholderSymbolTable, SymbolResolver};
use crate::validate::{Accepted, Validator};

/// What one cycle produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The decoder refused the input.
    InvalidInput(DecodeError),
    Accepted {
        command: LoadCommand,
        accepted: Accepted,
    },
    Rejected {
        command: LoadCommand,
        rejection: Rejection,
    },
}

impl CycleOutcome {
    #[must_use]
    pub const fn result(&self) -> FuzzResult {
        match self {
            Self::InvalidInput(_) => FuzzResult::InvalidInput,
            Self::Accepted { .. } => FuzzResult::Success,
            Self::Rejected { .. } => FuzzResult::Error,
        }
    }

    /// Flight status code, `None` when nothing was decoded.
    #[must_use]
    pub const fn status_code(&self) -> Option<i32> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Accepted { .. } => Some(STATUS_SUCCESS),
            Self::Rejected { rejection, .. } => Some(rejection.code()),
        }
    }

    #[must_use]
    pub const fn command(&self) -> Option<&LoadCommand> {
        match self {
            Self::InvalidInput(_) => None,
            Self::Accepted { command, .. } | Self::Rejected { command, .. } => Some(command),
        }
    }
}

/// Owns the policy context and the counters of one fuzzing worker.
#[derive(Debug, Clone)]
pub struct FuzzSession<R = PlaceholderSymbolTable> {
    validator: Validator<R>,
    stats: FuzzStats,
}

impl FuzzSession<PlaceholderSymbolTable> {
    /// Session backed by the placeholder symbol table.
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self::with_validator(Validator::simulation(policy))
    }
}

impl<R: SymbolResolver> FuzzSession<R> {
    #[must_use]
    pub fn with_validator(validator: Validator<R>) -> Self {
        Self {
            validator,
            stats: FuzzStats::new(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> &Policy {
        self.validator.policy()
    }

    #[must_use]
    pub const fn validator(&self) -> &Validator<R> {
        &self.validator
    }

    /// Decode, validate, count. Never panics on any input.
    pub fn run_one(&mut self, input: &[u8]) -> CycleOutcome {
        let outcome = match decode(input, self.validator.policy()) {
            Err(err) => CycleOutcome::InvalidInput(err),
            Ok(command) => match self.validator.validate(&command) {
                Ok(accepted) => CycleOutcome::Accepted { command, accepted },
                Err(rejection) => CycleOutcome::Rejected { command, rejection },
            },
        };
        self.stats.record(outcome.result());
        outcome
    }

    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }
}
