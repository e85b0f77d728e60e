//! Fuzz bytes -> [`LoadCommand`].
//!
//! Layout consumed from the input, in order:
//!
//! | field        | bytes | derivation                                      |
//! |--------------|-------|-------------------------------------------------|
//! | memory type  | 1     | `b % 2 + 1` (RAM or EEPROM)                     |
//! | byte count   | 4     | native-endian `u32 % max_for(type) + 1`         |
//! | checksum     | 4     | native-endian `u32`, verbatim                   |
//! | dest select  | 1     | even: symbol, odd: direct address               |
//! | dest payload | 1 / 8 | symbol table seed, or raw address               |
//! | path select  | 1     | allow-listed prefix seed                        |
//!
//! Inputs below [`MIN_INPUT_LEN`] are refused. Past that gate every field
//! that runs out of bytes takes its default, so any long-enough input yields
//! a structurally valid record.

use crate::command::{Destination, FileName, LoadCommand, SymbolName};
use crate::error::DecodeError;
use crate::policy::{MemType, Policy};

/// Memory type, byte count and checksum must all be present.
pub const MIN_INPUT_LEN: usize = 1 + 4 + 4;
pub const DEFAULT_MEM_TYPE: MemType = MemType::Ram;
pub const DEFAULT_BYTE_COUNT: u32 = 1024;
pub const DEFAULT_CHECKSUM: u32 = 0;
pub const DEFAULT_FILE_NAME: &str = "/cf/apps/default.bin";
pub const FILE_SUFFIX: &str = "testfile.bin";
/// Raw direct addresses are masked to 31 bits before rebasing.
pub const DIRECT_ADDRESS_MASK: u64 = 0x7FFF_FFFF;

/// Forward-only reader over the fuzz input.
struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Take exactly `N` bytes, or nothing (cursor unchanged) if fewer remain.
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let chunk: [u8; N] = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(chunk)
    }

    fn byte(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }
}

/// Decode one command record from raw fuzz bytes.
pub fn decode(input: &[u8], policy: &Policy) -> Result<LoadCommand, DecodeError> {
    if input.len() < MIN_INPUT_LEN {
        return Err(DecodeError::TooShort {
            len: input.len(),
            min: MIN_INPUT_LEN,
        });
    }

    let mut cursor = ByteCursor::new(input);

    let memory_type = cursor
        .byte()
        .map(|b| if b % 2 == 0 { MemType::Ram } else { MemType::Eeprom })
        .unwrap_or(DEFAULT_MEM_TYPE);

    let max = policy.max_for(memory_type);
    let byte_count = cursor
        .take::<4>()
        .map(|raw| u32::from_ne_bytes(raw) % max + 1)
        .unwrap_or(DEFAULT_BYTE_COUNT);

    let checksum = cursor
        .take::<4>()
        .map(u32::from_ne_bytes)
        .unwrap_or(DEFAULT_CHECKSUM);

    let destination = decode_destination(&mut cursor, policy, memory_type);
    let file_name = decode_file_name(&mut cursor, policy);

    let mut command = LoadCommand::new(memory_type, byte_count, destination, file_name);
    command.checksum = checksum;
    Ok(command)
}

fn decode_destination(
    cursor: &mut ByteCursor<'_>,
    policy: &Policy,
    memory_type: MemType,
) -> Destination {
    let base = policy.base_address(memory_type);
    let fallback = Destination::DirectAddress { address: base };

    let Some(selector) = cursor.byte() else {
        return fallback;
    };

    if selector % 2 == 0 {
        cursor
            .byte()
            .and_then(|seed| policy.symbol(seed))
            .map(|name| Destination::Symbol {
                name: SymbolName::truncating(name),
                offset: 0,
            })
            .unwrap_or(fallback)
    } else {
        cursor
            .take::<8>()
            .map(|raw| Destination::DirectAddress {
                address: base + (u64::from_ne_bytes(raw) & DIRECT_ADDRESS_MASK),
            })
            .unwrap_or(fallback)
    }
}

fn decode_file_name(cursor: &mut ByteCursor<'_>, policy: &Policy) -> FileName {
    match cursor.byte().and_then(|seed| policy.path(seed)) {
        Some(prefix) => FileName::truncating(prefix).with_suffix_if_fits(FILE_SUFFIX),
        None => FileName::truncating(DEFAULT_FILE_NAME),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandHeader;

    fn fixed_prefix(mem: u8, count: u32, crc: u32) -> Vec<u8> {
        let mut v = vec![mem];
        v.extend_from_slice(&count.to_ne_bytes());
        v.extend_from_slice(&crc.to_ne_bytes());
        v
    }

    #[test]
    fn cursor_does_not_advance_on_short_take() {
        let data = [1u8, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.take::<4>(), None);
        assert_eq!(cursor.byte(), Some(1));
        assert_eq!(cursor.take::<2>(), Some([2, 3]));
        assert_eq!(cursor.byte(), None);
    }

    #[test]
    fn rejects_input_below_minimum() {
        let policy = Policy::default();
        for len in 0..MIN_INPUT_LEN {
            let err = decode(&vec![0xAA; len], &policy).unwrap_err();
            assert_eq!(
                err,
                DecodeError::TooShort {
                    len,
                    min: MIN_INPUT_LEN
                }
            );
        }
    }

    #[test]
    fn minimum_input_uses_tail_defaults() {
        let policy = Policy::default();
        let input = fixed_prefix(0x04, 99, 0xCAFE_F00D);
        let cmd = decode(&input, &policy).unwrap();
        assert_eq!(cmd.header, CommandHeader::load_from_file());
        assert_eq!(cmd.memory_type, MemType::Ram);
        assert_eq!(cmd.byte_count, 100);
        assert_eq!(cmd.checksum, 0xCAFE_F00D);
        assert_eq!(
            cmd.destination,
            Destination::DirectAddress {
                address: 0x2000_0000
            }
        );
        assert_eq!(cmd.file_name.as_str(), DEFAULT_FILE_NAME);
    }

    #[test]
    fn byte_count_wraps_per_type() {
        let policy = Policy::default();
        let cmd = decode(&fixed_prefix(0x01, u32::MAX, 0), &policy).unwrap();
        assert_eq!(cmd.memory_type, MemType::Eeprom);
        assert_eq!(cmd.byte_count, u32::MAX % 131_072 + 1);

        let cmd = decode(&fixed_prefix(0x00, 1_048_576 - 1, 0), &policy).unwrap();
        assert_eq!(cmd.byte_count, 1_048_576);
    }

    #[test]
    fn odd_selector_rebases_masked_address() {
        let policy = Policy::default();
        let mut input = fixed_prefix(0x01, 0, 0);
        input.push(0x03);
        input.extend_from_slice(&u64::MAX.to_ne_bytes());
        input.push(0x05);
        let cmd = decode(&input, &policy).unwrap();
        assert_eq!(
            cmd.destination,
            Destination::DirectAddress {
                address: 0x0808_0000 + 0x7FFF_FFFF
            }
        );
        assert_eq!(cmd.file_name.as_str(), "/ram/testfile.bin");
    }

    #[test]
    fn truncated_address_falls_back_to_base() {
        let policy = Policy::default();
        let mut input = fixed_prefix(0x00, 0, 0);
        input.push(0x01);
        input.extend_from_slice(&[0xFF; 7]);
        let cmd = decode(&input, &policy).unwrap();
        assert_eq!(
            cmd.destination,
            Destination::DirectAddress {
                address: 0x2000_0000
            }
        );
        // The cursor never advanced past the selector, so the first orphaned
        // byte (0xFF, 255 % 15 == 0) picks the path.
        assert_eq!(cmd.file_name.as_str(), "/cf/apps/testfile.bin");
    }

    #[test]
    fn even_selector_without_seed_falls_back_to_base() {
        let policy = Policy::default();
        let mut input = fixed_prefix(0x01, 0, 0);
        input.push(0x02);
        let cmd = decode(&input, &policy).unwrap();
        assert_eq!(
            cmd.destination,
            Destination::DirectAddress {
                address: 0x0808_0000
            }
        );
        assert_eq!(cmd.file_name.as_str(), DEFAULT_FILE_NAME);
    }

    #[test]
    fn symbol_selection_wraps_table() {
        let policy = Policy::default();
        let mut input = fixed_prefix(0x00, 0, 0);
        input.extend_from_slice(&[0x00, 24 + 5, 0x00]);
        let cmd = decode(&input, &policy).unwrap();
        assert_eq!(
            cmd.destination,
            Destination::Symbol {
                name: SymbolName::new("MM_AppData").unwrap(),
                offset: 0
            }
        );
        assert_eq!(cmd.file_name.as_str(), "/cf/apps/testfile.bin");
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let policy = Policy::default();
        let mut input = fixed_prefix(0x00, 7, 0);
        input.extend_from_slice(&[0x00, 0x00, 0x00]);
        let short = decode(&input, &policy).unwrap();
        input.extend_from_slice(&[0xEE; 64]);
        let long = decode(&input, &policy).unwrap();
        assert_eq!(short, long);
    }
}
