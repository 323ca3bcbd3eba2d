//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural
//! principles on the showcase engine sources:
//! - No sleeping outside the timer slots (wait on events, never poll)
//! - No `unwrap()` in production code (propagate or report instead)
//!
//! The scanning helpers live here so each test file stays a policy table.

use std::fs;
use std::path::{Path, PathBuf};

/// A forbidden pattern found in production code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File the pattern was found in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// Trimmed source line
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Root of the engine sources, relative to this crate
#[must_use]
pub fn engine_src() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../showcase/core/src")
}

/// Production lines of a source file: comments stripped, test module cut off
///
/// Everything from the first `#[cfg(test)]` on is treated as test code.
#[must_use]
pub fn production_lines(content: &str) -> Vec<(usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .collect()
}

/// Scan every `.rs` file under `dir` for lines matching `is_violation`
///
/// Files whose name is in `allowed_files` are skipped.
pub fn scan<F>(dir: &Path, allowed_files: &[&str], is_violation: F) -> Vec<Violation>
where
    F: Fn(&str) -> bool,
{
    let mut violations = Vec::new();
    if !dir.exists() {
        return violations;
    }

    for entry in walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("rs") {
            continue;
        }
        let name = path.file_name().and_then(|s| s.to_str()).unwrap_or("");
        if allowed_files.contains(&name) {
            continue;
        }
        let Ok(content) = fs::read_to_string(path) else {
            continue;
        };

        for (line, code) in production_lines(&content) {
            if is_violation(code) {
                violations.push(Violation {
                    path: path.to_path_buf(),
                    line,
                    text: code.trim().to_string(),
                });
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let src = "fn a() {}\n// note\nfn b() { x.unwrap() } // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(src);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].1, "");
        assert_eq!(lines[2], (3, "fn b() { x.unwrap() } "));
    }
}
