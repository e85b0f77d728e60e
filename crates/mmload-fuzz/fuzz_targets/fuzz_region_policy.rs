#![no_main]
use libfuzzer_sys::fuzz_target;
use mmload_core::{Access, MemType, Policy, Rejection};

const RECORD: usize = 8 + 4 + 1;

fuzz_target!(|data: &[u8]| {
    // Each 13-byte record is (address, size, memory type).
    let policy = Policy::default();

    for chunk in data.chunks_exact(RECORD) {
        let address = u64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3],
            chunk[4], chunk[5], chunk[6], chunk[7],
        ]);
        let size = u32::from_le_bytes([chunk[8], chunk[9], chunk[10], chunk[11]]);
        let Some(mem_type) = MemType::from_raw(chunk[12]) else {
            continue;
        };

        // Should never panic regardless of input
        let read = policy.check_region(address, size, mem_type, Access::Read);
        let write = policy.check_region(address, size, mem_type, Access::Write);

        assert_eq!(read.is_ok(), policy.region_lookup(address, size, mem_type));
        if size == 0 {
            assert!(read.is_err());
        }
        match write {
            Ok(region) => assert!(region.writable),
            Err(Rejection::PermissionDenied { .. }) => assert!(read.is_ok()),
            Err(_) => assert!(read.is_err()),
        }
    }
});
