//! Integration Test: Overlay Architecture Rules
//!
//! **Policy**: overlay registries are constructor-injected values, production
//! code propagates errors instead of panicking, and async code never blocks
//! a runtime thread.

use architectural_enforcement::{
    is_blocking_sleep, is_global_registry, is_unwrap, scan, workspace_root, Violation,
};

const PRODUCTION_DIRS: [&str; 2] = ["overlay/core/src", "overlay/demo/src"];

fn scan_production(rule: &'static str, offends: fn(&str) -> bool) -> Vec<Violation> {
    let root = workspace_root();
    PRODUCTION_DIRS
        .iter()
        .flat_map(|dir| scan(&root.join(dir), rule, offends))
        .collect()
}

fn report(violations: &[Violation], headline: &str, fix: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {headline}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    eprintln!("\n✅ {fix}");
    panic!(
        "\nFound {} violation(s) in production code.\nFix these before merging!",
        violations.len()
    );
}

#[test]
fn test_sources_are_found() {
    let root = workspace_root();
    let files = architectural_enforcement::rust_sources(&root.join("overlay/core/src"));
    assert!(
        files.iter().any(|f| f.ends_with("machine.rs")),
        "scanner did not find the state machine under {}",
        root.display()
    );
}

#[test]
fn test_no_global_registries() {
    let violations = scan_production("Module-level registry", is_global_registry);
    report(
        &violations,
        "Global mutable state found",
        "Pass an OverlayRegistry to Overlay::builder instead",
    );
}

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = scan_production("Panicking unwrap", is_unwrap);
    report(
        &violations,
        "unwrap()/expect() found in production code",
        "Propagate with `?` or handle the None/Err case",
    );
}

#[test]
fn test_no_blocking_sleep() {
    let violations = scan_production("Blocking sleep", is_blocking_sleep);
    report(
        &violations,
        "std::thread::sleep found in production code",
        "Use tokio::time::sleep(..).await",
    );
}
