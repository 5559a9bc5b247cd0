//! Working copy management: ensure a repository is checked out at a branch.
//!
//! Two idempotency strategies exist and both are preserved:
//! - `FreshClone` removes the target directory and re-clones. Used for the
//!   local checkout stage, where the working copy is disposable.
//! - `CloneOrPull` trusts a `.git` marker: clone when absent, otherwise
//!   fetch + checkout + pull. Used on the deploy target, where the working
//!   copy persists between runs.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::utils::shell;

#[derive(Debug, Clone)]
pub struct RepoSpec {
    pub url: String,
    pub branch: String,
    /// Target directory, local or remote depending on the runner.
    pub target_dir: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkcopyStrategy {
    /// Remove any existing directory and clone from scratch.
    FreshClone,
    /// Clone if no `.git` marker is present, otherwise update in place.
    /// `create_branch` controls whether a locally-missing branch is created
    /// tracking the remote instead of failing the checkout.
    CloneOrPull { create_branch: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkcopyOutcome {
    Cloned,
    Updated,
}

/// Ensure `target_dir` holds a working copy of `url` at the tip of `branch`.
pub fn ensure_at_branch(
    runner: &dyn CommandRunner,
    spec: &RepoSpec,
    strategy: WorkcopyStrategy,
) -> Result<WorkcopyOutcome> {
    match strategy {
        WorkcopyStrategy::FreshClone => fresh_clone(runner, spec),
        WorkcopyStrategy::CloneOrPull { create_branch } => {
            clone_or_pull(runner, spec, create_branch)
        }
    }
}

fn fresh_clone(runner: &dyn CommandRunner, spec: &RepoSpec) -> Result<WorkcopyOutcome> {
    let dir = shell::quote_path(&spec.target_dir);

    let rm = runner.run(&format!("rm -rf {}", dir));
    if !rm.success {
        return Err(step_error("remove stale working copy", &rm.stderr));
    }

    log_status!("checkout", "Cloning {} ({})", spec.url, spec.branch);
    let clone = runner.run(&format!(
        "git clone --branch {} {} {}",
        shell::quote_arg(&spec.branch),
        shell::quote_arg(&spec.url),
        dir,
    ));
    if !clone.success {
        return Err(step_error("git clone", &clone.stderr));
    }

    Ok(WorkcopyOutcome::Cloned)
}

fn clone_or_pull(
    runner: &dyn CommandRunner,
    spec: &RepoSpec,
    create_branch: bool,
) -> Result<WorkcopyOutcome> {
    let dir = shell::quote_path(&spec.target_dir);
    let branch = shell::quote_arg(&spec.branch);

    if !runner.check(&format!("[ -d {}/.git ]", dir)) {
        log_status!("checkout", "No working copy at {}, cloning", spec.target_dir);
        let clone = runner.run(&format!(
            "git clone --branch {} {} {}",
            branch,
            shell::quote_arg(&spec.url),
            dir,
        ));
        if !clone.success {
            return Err(step_error("git clone", &clone.stderr));
        }
        return Ok(WorkcopyOutcome::Cloned);
    }

    let fetch = runner.run(&format!("cd {} && git fetch origin", dir));
    if !fetch.success {
        return Err(step_error("git fetch", &fetch.stderr));
    }

    // Branch may not exist locally yet on a long-lived working copy.
    let has_branch = runner.check(&format!(
        "cd {} && git rev-parse --verify {}",
        dir, branch
    ));

    let checkout_cmd = if !has_branch && create_branch {
        log_status!("checkout", "Creating local branch {}", spec.branch);
        format!(
            "cd {} && git checkout -b {} origin/{}",
            dir, branch, branch
        )
    } else {
        format!("cd {} && git checkout {}", dir, branch)
    };

    let checkout = runner.run(&checkout_cmd);
    if !checkout.success {
        return Err(step_error("git checkout", &checkout.stderr));
    }

    let pull = runner.run(&format!("cd {} && git pull origin {}", dir, branch));
    if !pull.success {
        return Err(step_error("git pull", &pull.stderr));
    }

    Ok(WorkcopyOutcome::Updated)
}

fn step_error(step: &str, stderr: &str) -> Error {
    let detail = stderr.trim();
    if detail.is_empty() {
        Error::checkout_failed(format!("{} failed", step))
    } else {
        Error::checkout_failed(format!("{} failed: {}", step, detail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::CommandOutput;

    fn spec() -> RepoSpec {
        RepoSpec {
            url: "git@github.com:acme/flaskapp.git".to_string(),
            branch: "main".to_string(),
            target_dir: "/home/deploy/flaskapp".to_string(),
        }
    }

    fn marker_absent() -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: false,
            exit_code: 1,
        }
    }

    #[test]
    fn fresh_clone_removes_then_clones() {
        let runner = ScriptedRunner::new();
        let outcome = ensure_at_branch(&runner, &spec(), WorkcopyStrategy::FreshClone).unwrap();
        assert_eq!(outcome, WorkcopyOutcome::Cloned);

        let commands = runner.commands.borrow();
        assert!(commands[0].starts_with("rm -rf"));
        assert!(commands[1].contains("git clone --branch main"));
    }

    #[test]
    fn clone_or_pull_clones_when_marker_absent() {
        let runner = ScriptedRunner::new().respond("[ -d", marker_absent());
        let outcome = ensure_at_branch(
            &runner,
            &spec(),
            WorkcopyStrategy::CloneOrPull {
                create_branch: false,
            },
        )
        .unwrap();
        assert_eq!(outcome, WorkcopyOutcome::Cloned);
        assert!(runner.ran("git clone --branch main"));
        assert!(!runner.ran("git pull"));
    }

    #[test]
    fn clone_or_pull_pulls_when_marker_present() {
        let runner = ScriptedRunner::new();
        let outcome = ensure_at_branch(
            &runner,
            &spec(),
            WorkcopyStrategy::CloneOrPull {
                create_branch: false,
            },
        )
        .unwrap();
        assert_eq!(outcome, WorkcopyOutcome::Updated);
        assert!(runner.ran("git fetch origin"));
        assert!(runner.ran("git checkout main"));
        assert!(runner.ran("git pull origin main"));
        assert!(!runner.ran("git clone"));
    }

    #[test]
    fn clone_or_pull_creates_missing_branch_when_enabled() {
        let runner = ScriptedRunner::new().respond("rev-parse --verify", marker_absent());
        ensure_at_branch(
            &runner,
            &spec(),
            WorkcopyStrategy::CloneOrPull {
                create_branch: true,
            },
        )
        .unwrap();
        assert!(runner.ran("git checkout -b main origin/main"));
    }

    #[test]
    fn clone_or_pull_fails_on_missing_branch_when_disabled() {
        let runner = ScriptedRunner::new()
            .respond("rev-parse --verify", marker_absent())
            .fail_on("git checkout main", "pathspec 'main' did not match");
        let err = ensure_at_branch(
            &runner,
            &spec(),
            WorkcopyStrategy::CloneOrPull {
                create_branch: false,
            },
        )
        .unwrap_err();
        assert_eq!(err.code.as_str(), "checkout.failed");
    }

    #[test]
    fn clone_failure_is_fatal() {
        let runner = ScriptedRunner::new()
            .respond("[ -d", marker_absent())
            .fail_on("git clone", "could not resolve host");
        let err = ensure_at_branch(
            &runner,
            &spec(),
            WorkcopyStrategy::CloneOrPull {
                create_branch: false,
            },
        )
        .unwrap_err();
        assert!(err.message.contains("git clone failed"));
    }
}
