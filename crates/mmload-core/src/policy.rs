//! Static memory-region policy.
//!
//! All tables are process-lifetime constants. The region scan is ordered and
//! first-match-wins: overlapping regions with different `writable` flags
//! resolve to whichever entry comes first.

use serde::{Deserialize, Serialize};

use crate::error::Rejection;
use crate::platform::TargetPlatform;

/// Filesystem path bound, including the terminator slot.
pub const PATH_BOUND: usize = 64;
/// Symbol-name bound, including the terminator slot.
pub const SYMBOL_NAME_BOUND: usize = 20;

/// Largest RAM load.
pub const MAX_LOAD_RAM: u32 = 1024 * 1024;
/// Largest EEPROM load.
pub const MAX_LOAD_EEPROM: u32 = 128 * 1024;
/// Limit applied to memory types that have no load limit of their own.
pub const MAX_LOAD_OTHER: u32 = 1024;

/// Memory type field of MM commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemType {
    Ram,
    Eeprom,
    Mem8,
    Mem16,
    Mem32,
}

impl MemType {
    /// Wire value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        match self {
            Self::Ram => 1,
            Self::Eeprom => 2,
            Self::Mem8 => 8,
            Self::Mem16 => 16,
            Self::Mem32 => 32,
        }
    }

    #[must_use]
    pub const fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Ram),
            2 => Some(Self::Eeprom),
            8 => Some(Self::Mem8),
            16 => Some(Self::Mem16),
            32 => Some(Self::Mem32),
            _ => None,
        }
    }

    /// Maximum bytes a single load may move into this memory type.
    #[must_use]
    pub const fn max_load_bytes(self) -> u32 {
        match self {
            Self::Ram => MAX_LOAD_RAM,
            Self::Eeprom => MAX_LOAD_EEPROM,
            Self::Mem8 | Self::Mem16 | Self::Mem32 => MAX_LOAD_OTHER,
        }
    }

    /// Access width in bytes for the data-size types.
    #[must_use]
    pub const fn access_width(self) -> Option<u64> {
        match self {
            Self::Mem8 => Some(1),
            Self::Mem16 => Some(2),
            Self::Mem32 => Some(4),
            Self::Ram | Self::Eeprom => None,
        }
    }

    /// True for the two types a file load may target.
    #[must_use]
    pub const fn is_loadable(self) -> bool {
        matches!(self, Self::Ram | Self::Eeprom)
    }
}

/// Physical kind of a memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Ram,
    Eeprom,
    Flash,
    Io,
}

impl RegionKind {
    /// Whether commands addressed with `mem_type` may land in this region.
    #[must_use]
    pub const fn accepts(self, mem_type: MemType) -> bool {
        matches!(
            (self, mem_type),
            (Self::Ram, MemType::Ram) | (Self::Eeprom, MemType::Eeprom)
        )
    }
}

/// One entry of the platform memory map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub start: u64,
    /// Inclusive.
    pub end: u64,
    pub kind: RegionKind,
    pub name: &'static str,
    pub writable: bool,
    pub executable: bool,
}

impl MemoryRegion {
    /// True when `[address, address + size - 1]` lies inside the region.
    /// Zero-sized accesses are never contained.
    #[must_use]
    pub fn contains(&self, address: u64, size: u32) -> bool {
        let Some(span) = u64::from(size).checked_sub(1) else {
            return false;
        };
        address >= self.start
            && address
                .checked_add(span)
                .is_some_and(|last| last <= self.end)
    }
}

/// Kind of access a command performs on its target region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

pub static DEFAULT_REGIONS: [MemoryRegion; 7] = [
    MemoryRegion {
        start: 0x2000_0000,
        end: 0x2007_FFFF,
        kind: RegionKind::Ram,
        name: "SRAM_MAIN",
        writable: true,
        executable: true,
    },
    MemoryRegion {
        start: 0x2008_0000,
        end: 0x200F_FFFF,
        kind: RegionKind::Ram,
        name: "SRAM_BACKUP",
        writable: true,
        executable: false,
    },
    MemoryRegion {
        start: 0x6000_0000,
        end: 0x67FF_FFFF,
        kind: RegionKind::Ram,
        name: "SDRAM_EXTERNAL",
        writable: true,
        executable: true,
    },
    MemoryRegion {
        start: 0x0808_0000,
        end: 0x080F_FFFF,
        kind: RegionKind::Eeprom,
        name: "EEPROM_CONFIG",
        writable: true,
        executable: false,
    },
    MemoryRegion {
        start: 0x0810_0000,
        end: 0x081F_FFFF,
        kind: RegionKind::Eeprom,
        name: "EEPROM_DATA",
        writable: true,
        executable: false,
    },
    MemoryRegion {
        start: 0x0800_0000,
        end: 0x0807_FFFF,
        kind: RegionKind::Flash,
        name: "FLASH_BOOT",
        writable: false,
        executable: true,
    },
    MemoryRegion {
        start: 0x0820_0000,
        end: 0x087F_FFFF,
        kind: RegionKind::Flash,
        name: "FLASH_APP",
        writable: false,
        executable: true,
    },
];

pub static VALID_SYMBOLS: [&str; 24] = [
    "CFE_ES_Global",
    "CFE_TBL_Global",
    "CFE_EVS_Global",
    "CFE_SB_Global",
    "CFE_TIME_Global",
    "MM_AppData",
    "MM_ResetArea",
    "MM_CmdCounter",
    "MM_ErrCounter",
    "CS_AppData",
    "DS_AppData",
    "FM_AppData",
    "HK_AppData",
    "LC_AppData",
    "MD_AppData",
    "SC_AppData",
    "SCH_AppData",
    "OS_VolumeTable",
    "PSP_MemoryTable",
    "CFE_PSP_MemoryTable",
    "BSP_RAM_START",
    "BSP_RAM_END",
    "BSP_EEPROM_START",
    "BSP_EEPROM_END",
];

pub static VALID_PATHS: [&str; 15] = [
    "/cf/apps/",
    "/cf/download/",
    "/cf/upload/",
    "/cf/log/",
    "/cf/tmp/",
    "/ram/",
    "/rom/",
    "/vol/",
    "/data/tables/",
    "/data/scripts/",
    "/data/config/",
    "/mission/apps/",
    "/mission/data/",
    "/platform/boot/",
    "/platform/config/",
];

/// The static policy a decode/validate cycle runs against.
///
/// Cheap to copy; every table is a `'static` slice.
#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub platform: TargetPlatform,
    pub regions: &'static [MemoryRegion],
    pub symbols: &'static [&'static str],
    pub paths: &'static [&'static str],
}

impl Policy {
    /// Default tables for `platform`.
    #[must_use]
    pub const fn new(platform: TargetPlatform) -> Self {
        Self {
            platform,
            regions: &DEFAULT_REGIONS,
            symbols: &VALID_SYMBOLS,
            paths: &VALID_PATHS,
        }
    }

    /// Replace the region table, keeping its order.
    #[must_use]
    pub const fn with_regions(mut self, regions: &'static [MemoryRegion]) -> Self {
        self.regions = regions;
        self
    }

    #[must_use]
    pub const fn max_for(&self, mem_type: MemType) -> u32 {
        mem_type.max_load_bytes()
    }

    /// Platform default load address for `mem_type`.
    #[must_use]
    pub const fn base_address(&self, mem_type: MemType) -> u64 {
        match mem_type {
            MemType::Eeprom => self.platform.eeprom_base(),
            _ => self.platform.ram_base(),
        }
    }

    #[must_use]
    pub const fn alignment(&self) -> u64 {
        self.platform.alignment()
    }

    /// Symbol picked by `seed`, wrapping over the table.
    #[must_use]
    pub fn symbol(&self, seed: u8) -> Option<&'static str> {
        pick(self.symbols, seed)
    }

    /// Path prefix picked by `seed`, wrapping over the table.
    #[must_use]
    pub fn path(&self, seed: u8) -> Option<&'static str> {
        pick(self.paths, seed)
    }

    #[must_use]
    pub fn is_known_symbol(&self, name: &str) -> bool {
        self.symbols.contains(&name)
    }

    /// True when `file_name` starts with an allow-listed prefix.
    #[must_use]
    pub fn is_allowed_path(&self, file_name: &str) -> bool {
        self.paths.iter().any(|prefix| file_name.starts_with(prefix))
    }

    /// First region (in table order) of a matching type that fully contains
    /// the access.
    #[must_use]
    pub fn find_region(
        &self,
        address: u64,
        size: u32,
        mem_type: MemType,
    ) -> Option<&'static MemoryRegion> {
        self.regions
            .iter()
            .find(|region| region.kind.accepts(mem_type) && region.contains(address, size))
    }

    /// Whether a fully-containing, type-matching region exists.
    #[must_use]
    pub fn region_lookup(&self, address: u64, size: u32, mem_type: MemType) -> bool {
        self.find_region(address, size, mem_type).is_some()
    }

    /// Region lookup plus the write-permission check for `access`.
    pub fn check_region(
        &self,
        address: u64,
        size: u32,
        mem_type: MemType,
        access: Access,
    ) -> Result<&'static MemoryRegion, Rejection> {
        let region =
            self.find_region(address, size, mem_type)
                .ok_or(Rejection::InvalidAddress {
                    address,
                    byte_count: size,
                    mem_type,
                })?;
        if access == Access::Write && !region.writable {
            return Err(Rejection::PermissionDenied {
                address,
                region: region.name.to_string(),
            });
        }
        Ok(region)
    }
}

impl Default for Policy {
    fn default() -> Self {
        Self::new(TargetPlatform::default())
    }
}

fn pick(table: &'static [&'static str], seed: u8) -> Option<&'static str> {
    if table.is_empty() {
        return None;
    }
    Some(table[usize::from(seed) % table.len()])
}

/// Accepts the data-size types used by peek/poke commands.
pub fn verify_data_size(raw: u8) -> Result<MemType, Rejection> {
    match MemType::from_raw(raw) {
        Some(width @ (MemType::Mem8 | MemType::Mem16 | MemType::Mem32)) => Ok(width),
        _ => Err(Rejection::InvalidDataSize { bits: raw }),
    }
}

/// Alignment rule for data-size accesses. Non data-size types never align.
#[must_use]
pub fn is_valid_alignment(address: u64, data_size: u8) -> bool {
    MemType::from_raw(data_size)
        .and_then(MemType::access_width)
        .is_some_and(|width| address % width == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_contains_is_inclusive_at_end() {
        let sram = &DEFAULT_REGIONS[0];
        assert!(sram.contains(0x2007_FFFC, 4));
        assert!(!sram.contains(0x2007_FFFD, 4));
        assert!(!sram.contains(0x1FFF_FFFF, 1));
        assert!(!sram.contains(0x2000_0000, 0));
    }

    #[test]
    fn contains_does_not_overflow() {
        let region = MemoryRegion {
            start: 0,
            end: u64::MAX,
            kind: RegionKind::Ram,
            name: "ALL",
            writable: true,
            executable: false,
        };
        assert!(region.contains(u64::MAX, 1));
        assert!(!region.contains(u64::MAX, 2));
    }

    #[test]
    fn lookup_requires_matching_type() {
        let policy = Policy::default();
        assert!(policy.region_lookup(0x2000_0000, 16, MemType::Ram));
        assert!(!policy.region_lookup(0x2000_0000, 16, MemType::Eeprom));
        assert!(policy.region_lookup(0x0808_0000, 16, MemType::Eeprom));
        // Flash is never a load target.
        assert!(!policy.region_lookup(0x0800_0000, 16, MemType::Ram));
    }

    #[test]
    fn access_spanning_two_adjacent_regions_is_rejected() {
        let policy = Policy::default();
        // SRAM_MAIN ends at 0x2007_FFFF, SRAM_BACKUP starts right after.
        assert!(!policy.region_lookup(0x2007_FFF0, 0x20, MemType::Ram));
    }

    static OVERLAPPING: [MemoryRegion; 2] = [
        MemoryRegion {
            start: 0x1000,
            end: 0x1FFF,
            kind: RegionKind::Ram,
            name: "GUARD",
            writable: false,
            executable: false,
        },
        MemoryRegion {
            start: 0x0000,
            end: 0xFFFF,
            kind: RegionKind::Ram,
            name: "WIDE",
            writable: true,
            executable: false,
        },
    ];

    #[test]
    fn first_match_wins_for_overlapping_regions() {
        let policy = Policy::default().with_regions(&OVERLAPPING);
        let region = policy.find_region(0x1800, 8, MemType::Ram).unwrap();
        assert_eq!(region.name, "GUARD");
        let err = policy
            .check_region(0x1800, 8, MemType::Ram, Access::Write)
            .unwrap_err();
        assert_eq!(
            err,
            Rejection::PermissionDenied {
                address: 0x1800,
                region: "GUARD".into()
            }
        );
        // Reads of the guarded window are fine.
        assert!(
            policy
                .check_region(0x1800, 8, MemType::Ram, Access::Read)
                .is_ok()
        );
        // Outside the guard the wide region answers.
        let wide = policy
            .check_region(0x4000, 8, MemType::Ram, Access::Write)
            .unwrap();
        assert_eq!(wide.name, "WIDE");
    }

    #[test]
    fn missing_region_is_invalid_address_not_permission() {
        let policy = Policy::default();
        let err = policy
            .check_region(0x9000_0000, 4, MemType::Ram, Access::Write)
            .unwrap_err();
        assert!(matches!(err, Rejection::InvalidAddress { .. }));
    }

    #[test]
    fn seeded_table_picks_wrap() {
        let policy = Policy::default();
        assert_eq!(policy.symbol(0), Some("CFE_ES_Global"));
        assert_eq!(policy.symbol(24), Some("CFE_ES_Global"));
        assert_eq!(policy.symbol(2), Some("CFE_EVS_Global"));
        assert_eq!(policy.path(1), Some("/cf/download/"));
        assert_eq!(policy.path(15), Some("/cf/apps/"));
    }

    #[test]
    fn table_entries_fit_their_bounds() {
        for name in VALID_SYMBOLS {
            assert!(name.len() < SYMBOL_NAME_BOUND, "{name}");
        }
        for path in VALID_PATHS {
            assert!(path.len() < PATH_BOUND, "{path}");
            assert!(path.starts_with('/') && path.ends_with('/'), "{path}");
        }
    }

    #[test]
    fn max_sizes_per_type() {
        let policy = Policy::default();
        assert_eq!(policy.max_for(MemType::Ram), 1_048_576);
        assert_eq!(policy.max_for(MemType::Eeprom), 131_072);
        assert_eq!(policy.max_for(MemType::Mem16), 1024);
    }

    #[test]
    fn base_address_follows_platform() {
        let arm = Policy::new(TargetPlatform::Arm);
        assert_eq!(arm.base_address(MemType::Ram), 0x6000_0000);
        assert_eq!(arm.base_address(MemType::Eeprom), 0x0810_0000);
        let sim = Policy::default();
        assert_eq!(sim.base_address(MemType::Eeprom), 0x0808_0000);
    }

    #[test]
    fn data_size_and_alignment_rules() {
        assert_eq!(verify_data_size(8), Ok(MemType::Mem8));
        assert_eq!(verify_data_size(32), Ok(MemType::Mem32));
        assert_eq!(
            verify_data_size(1),
            Err(Rejection::InvalidDataSize { bits: 1 })
        );
        assert_eq!(
            verify_data_size(12),
            Err(Rejection::InvalidDataSize { bits: 12 })
        );

        assert!(is_valid_alignment(0x1001, 8));
        assert!(is_valid_alignment(0x1002, 16));
        assert!(!is_valid_alignment(0x1002, 32));
        assert!(!is_valid_alignment(0x1000, 1));
    }

    #[test]
    fn mem_type_raw_round_trip() {
        for raw in 0..=u8::MAX {
            if let Some(t) = MemType::from_raw(raw) {
                assert_eq!(t.raw(), raw);
            }
        }
        assert!(MemType::Ram.is_loadable());
        assert!(!MemType::Mem32.is_loadable());
    }
}
