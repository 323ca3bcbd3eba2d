//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Engine code never sleeps to wait for something. Every delay
//! is a timer slot (`timers.rs`), so it can be cancelled and replaced.
//! **Exceptions**: the timer slots themselves, the recording host used by
//! tests (`test_utils.rs`), test code.

use architectural_enforcement::{engine_src, scan};

#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan(&engine_src(), &["timers.rs", "test_utils.rs"], |code| {
        code.contains("::sleep(") || code.contains(".sleep(")
    });

    if !violations.is_empty() {
        eprintln!("\n❌ Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Arm a TimerSlots purpose instead.");
        panic!("\nFound {} sleep violation(s).", violations.len());
    }
}

#[test]
fn test_no_blocking_sleep_anywhere() {
    let violations = scan(&engine_src(), &[], |code| code.contains("thread::sleep("));
    assert!(
        violations.is_empty(),
        "blocking sleeps stall the runtime: {violations:#?}"
    );
}
