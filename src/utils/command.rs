//! Command execution primitives with consistent error handling.

use std::process::Command;

/// Run a command in a directory, returning None on failure instead of error.
///
/// Useful when command failure is expected/acceptable (e.g., asking git for
/// the current revision of a directory that may not be a repository).
pub fn run_in_optional(dir: &str, program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .current_dir(dir)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

/// Short revision hash of a local working copy, if it is a git repository.
pub fn git_revision(dir: &str) -> Option<String> {
    run_in_optional(dir, "git", &["rev-parse", "--short", "HEAD"])
}
