//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles
//! of the overlay crates:
//! - No module-level registries (registries are injected, never global)
//! - No `unwrap()` / `expect()` in production code
//! - No blocking sleeps in production code
//!
//! The helpers below walk a source tree and report offending lines. Test
//! modules (everything after a `#[cfg(test)]` line) are skipped.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// One offending source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Rule that was broken
    pub rule: &'static str,
    /// The trimmed source line
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} - {}: {}",
            self.file.display(),
            self.line,
            self.rule,
            self.text
        )
    }
}

/// Workspace root, resolved from this crate's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

/// Every `.rs` file under `dir`
#[must_use]
pub fn rust_sources(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|entry| entry.into_path())
        .collect()
}

/// Production lines of a source file as `(line_number, code)`
///
/// Stops at the first `#[cfg(test)]`; strips `//` comments.
#[must_use]
pub fn production_lines(source: &str) -> Vec<(usize, &str)> {
    source
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .filter(|(_, code)| !code.trim().is_empty())
        .collect()
}

/// Scan production code under `dir` with a line predicate
#[must_use]
pub fn scan(dir: &Path, rule: &'static str, offends: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for file in rust_sources(dir) {
        let Ok(content) = fs::read_to_string(&file) else {
            continue;
        };
        for (line, code) in production_lines(&content) {
            if offends(code) {
                violations.push(Violation {
                    file: file.clone(),
                    line,
                    rule,
                    text: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

/// A `static` holding shared mutable state
#[must_use]
pub fn is_global_registry(code: &str) -> bool {
    let code = code.trim();
    let is_static = code.starts_with("static ") || code.starts_with("pub static ");
    is_static
        && ["Mutex<", "RwLock<", "OnceLock<", "OnceCell<", "Lazy<", "HashMap<"]
            .iter()
            .any(|ty| code.contains(ty))
}

/// A panicking unwrap
#[must_use]
pub fn is_unwrap(code: &str) -> bool {
    code.contains(".unwrap()") || code.contains(".expect(")
}

/// A blocking sleep
#[must_use]
pub fn is_blocking_sleep(code: &str) -> bool {
    code.contains("std::thread::sleep") || code.contains("thread::sleep(")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// note\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }\n";
        let lines = production_lines(source);
        assert_eq!(lines, vec![(1, "fn a() {}")]);
    }

    #[test]
    fn test_rules() {
        assert!(is_global_registry(
            "static REGISTRY: Lazy<Mutex<Vec<u8>>> = Lazy::new(Default::default);"
        ));
        assert!(!is_global_registry("static COUNTER: AtomicU64 = AtomicU64::new(1);"));
        assert!(is_unwrap("let x = y.unwrap();"));
        assert!(!is_unwrap("let x = y.unwrap_or_default();"));
        assert!(is_blocking_sleep("std::thread::sleep(d);"));
        assert!(!is_blocking_sleep("tokio::time::sleep(d).await;"));
    }
}
