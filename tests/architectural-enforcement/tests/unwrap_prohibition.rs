//! Integration Test: Unwrap Prohibition
//!
//! **Policy**: Production code propagates failures with `?` or reports them
//! through the error channel. `unwrap()` is only acceptable in tests.

use architectural_enforcement::{engine_src, scan};

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = scan(&engine_src(), &[], |code| code.contains(".unwrap()"));

    if !violations.is_empty() {
        eprintln!("\n❌ unwrap() found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!("\nFound {} unwrap violation(s).", violations.len());
    }
}

#[test]
fn test_engine_sources_present() {
    assert!(
        engine_src().join("showcase.rs").exists(),
        "engine sources not found at {}",
        engine_src().display()
    );
}
