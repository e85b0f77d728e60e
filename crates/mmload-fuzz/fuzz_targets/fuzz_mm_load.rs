#![no_main]
use std::cell::RefCell;

use libfuzzer_sys::fuzz_target;
use mmload_core::{CycleOutcome, FuzzSession, MIN_INPUT_LEN, Policy, target_platform};

thread_local! {
    static SESSION: RefCell<FuzzSession> = RefCell::new(FuzzSession::new(Policy::new(target_platform())));
}

fuzz_target!(
    init: {
        println!("mmload fuzz harness {} initialized", env!("CARGO_PKG_VERSION"));
        println!("Target: MM load-from-file ({})", target_platform().name());
        println!("Minimum record: {MIN_INPUT_LEN} bytes");
    },
    |data: &[u8]| {
        SESSION.with(|cell| {
            let mut session = cell.borrow_mut();
            let policy = *session.policy();
            let outcome = session.run_one(data);

            // Decoded records are always structurally valid.
            if let Some(cmd) = outcome.command() {
                assert!(cmd.byte_count >= 1);
                assert!(cmd.byte_count <= policy.max_for(cmd.memory_type));
                assert!(!cmd.file_name.is_empty());
            }

            // Accepted loads sit entirely inside a writable region.
            if let CycleOutcome::Accepted { command, accepted } = &outcome {
                let region = policy
                    .find_region(accepted.resolved_address, command.byte_count, command.memory_type)
                    .expect("accepted load has a region");
                assert!(region.writable);
                assert_eq!(accepted.resolved_address % policy.alignment(), 0);
            }
        });
    }
);
