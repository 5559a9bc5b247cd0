//! Test stage: run the suite inside the built environment.

use serde::Serialize;

use crate::app::{App, TestFailureMode};
use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::utils::shell;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub test_command: String,
    pub success: bool,
    pub exit_code: i32,
    pub suppressed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub output: String,
}

fn test_command(app: &App) -> String {
    match &app.test_command {
        Some(cmd) => cmd.clone(),
        None => format!("{}/bin/python -m pytest", app.venv_dir),
    }
}

/// Run the test suite in the working copy.
///
/// With `TestFailureMode::Suppress` a failing suite is recorded in the
/// report and the caller is expected to continue; with `Fatal` the failure
/// is returned as an error.
pub fn run_suite(runner: &dyn CommandRunner, app: &App, workdir: &str) -> Result<TestReport> {
    let command = test_command(app);
    log_status!("test", "Running: {}", command);

    let output = runner.run(&format!(
        "cd {} && {}",
        shell::quote_path(workdir),
        command
    ));

    let combined = if output.stderr.trim().is_empty() {
        output.stdout.clone()
    } else {
        format!("{}\n{}", output.stdout, output.stderr)
    };

    if output.success {
        return Ok(TestReport {
            test_command: command,
            success: true,
            exit_code: output.exit_code,
            suppressed: false,
            output: combined,
        });
    }

    match app.test_failure {
        TestFailureMode::Fatal => Err(Error::tests_failed(output.exit_code, combined)),
        TestFailureMode::Suppress => {
            log_status!(
                "test",
                "Test suite failed (exit {}), continuing",
                output.exit_code
            );
            Ok(TestReport {
                test_command: command,
                success: false,
                exit_code: output.exit_code,
                suppressed: true,
                output: combined,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::CommandOutput;

    fn app_with_mode(mode: &str) -> App {
        serde_json::from_str(&format!(
            r#"{{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp",
                "testFailure": "{}"
            }}"#,
            mode
        ))
        .unwrap()
    }

    fn failing_suite() -> CommandOutput {
        CommandOutput {
            stdout: "1 failed, 3 passed".to_string(),
            stderr: String::new(),
            success: false,
            exit_code: 1,
        }
    }

    #[test]
    fn passing_suite_reports_success() {
        let runner = ScriptedRunner::new();
        let report = run_suite(&runner, &app_with_mode("suppress"), "/work/flaskapp").unwrap();
        assert!(report.success);
        assert!(!report.suppressed);
        assert!(runner.ran("venv/bin/python -m pytest"));
    }

    #[test]
    fn failure_is_suppressed_in_suppress_mode() {
        let runner = ScriptedRunner::new().respond("pytest", failing_suite());
        let report = run_suite(&runner, &app_with_mode("suppress"), "/work/flaskapp").unwrap();
        assert!(!report.success);
        assert!(report.suppressed);
        assert_eq!(report.exit_code, 1);
    }

    #[test]
    fn failure_is_fatal_in_fatal_mode() {
        let runner = ScriptedRunner::new().respond("pytest", failing_suite());
        let err = run_suite(&runner, &app_with_mode("fatal"), "/work/flaskapp").unwrap_err();
        assert_eq!(err.code.as_str(), "tests.failed");
    }

    #[test]
    fn custom_test_command_is_used() {
        let mut app = app_with_mode("suppress");
        app.test_command = Some("venv/bin/python -m unittest discover".to_string());
        let runner = ScriptedRunner::new();
        let report = run_suite(&runner, &app, "/work/flaskapp").unwrap();
        assert_eq!(report.test_command, "venv/bin/python -m unittest discover");
    }
}
