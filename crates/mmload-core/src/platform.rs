//! Flight-target platform profiles.
//!
//! The target is selected with the `MMLOAD_TARGET` environment variable:
//! - `simulation` (default): host simulation profile.
//! - `x86`, `arm`, `sparc`, `vxworks`: flight board profiles.
//!
//! Only the harness reads the environment. Core entry points take the
//! resolved [`TargetPlatform`] through an explicit [`crate::Policy`].

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`target_platform`].
pub const TARGET_ENV_VAR: &str = "MMLOAD_TARGET";

/// Flight target whose memory map the validator models.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    X86,
    Arm,
    Sparc,
    VxWorks,
    /// Host simulation. Same map as x86.
    #[default]
    Simulation,
}

impl TargetPlatform {
    /// Parse from string (case-insensitive). Unknown names map to simulation.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" | "x86_64" | "i386" => Self::X86,
            "arm" | "aarch32" | "cortex" => Self::Arm,
            "sparc" | "leon" | "leon3" => Self::Sparc,
            "vxworks" | "vxw" => Self::VxWorks,
            _ => Self::Simulation,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::Sparc => "sparc",
            Self::VxWorks => "vxworks",
            Self::Simulation => "simulation",
        }
    }

    /// Default RAM load address. Also the base the placeholder symbol
    /// table derives addresses from.
    #[must_use]
    pub const fn ram_base(self) -> u64 {
        match self {
            Self::Arm => 0x6000_0000,
            Self::Sparc => 0x4000_0000,
            Self::X86 | Self::VxWorks | Self::Simulation => 0x2000_0000,
        }
    }

    /// Default EEPROM load address.
    #[must_use]
    pub const fn eeprom_base(self) -> u64 {
        match self {
            Self::X86 | Self::Simulation => 0x0808_0000,
            Self::Arm => 0x0810_0000,
            Self::Sparc => 0x3000_0000,
            Self::VxWorks => 0x0800_0000,
        }
    }

    /// Required destination alignment for a load, in bytes.
    #[must_use]
    pub const fn alignment(self) -> u64 {
        match self {
            Self::Sparc => 8,
            Self::X86 | Self::Arm | Self::VxWorks | Self::Simulation => 4,
        }
    }
}

static GLOBAL_TARGET: OnceLock<TargetPlatform> = OnceLock::new();

/// Get the configured target (reads env var on first call, caches thereafter).
#[must_use]
pub fn target_platform() -> TargetPlatform {
    *GLOBAL_TARGET.get_or_init(|| {
        std::env::var(TARGET_ENV_VAR)
            .map(|v| TargetPlatform::from_str_loose(&v))
            .unwrap_or_default()
    })
}
