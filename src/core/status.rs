//! Remote state inspection without deploying.

use serde::Serialize;

use crate::app::{self, App};
use crate::error::Result;
use crate::runner::{CommandRunner, RemoteRunner};
use crate::server;
use crate::ssh::SshClient;
use crate::utils::shell;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub app_id: String,
    pub target: String,
    pub remote_path: String,
    pub workcopy_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_branch: Option<String>,
    pub venv_present: bool,
    pub manifest_present: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_registered: Option<bool>,
}

/// Inspect the deploy target for an app.
pub fn run(app_id: &str) -> Result<StatusReport> {
    let app = app::load(app_id)?;
    let server = server::resolve(app.server_id.as_deref())?;
    let client = SshClient::from_server(&server, &server.id)?;
    let runner = RemoteRunner::new(&client);
    inspect(&runner, &app)
}

pub fn inspect(runner: &dyn CommandRunner, app: &App) -> Result<StatusReport> {
    let remote_path = app.effective_remote_path();
    let dir = shell::quote_path(&remote_path);

    let workcopy_present = runner.check(&format!("[ -d {}/.git ]", dir));

    let current_branch = if workcopy_present {
        let output = runner.run(&format!("cd {} && git rev-parse --abbrev-ref HEAD", dir));
        if output.success {
            let branch = output.stdout.trim().to_string();
            (!branch.is_empty()).then_some(branch)
        } else {
            None
        }
    } else {
        None
    };

    let venv_present = runner.check(&format!(
        "cd {} && [ -d {} ]",
        dir,
        shell::quote_arg(&app.venv_dir)
    ));

    let manifest_present = runner.check(&format!(
        "cd {} && [ -f {} ]",
        dir,
        shell::quote_arg(&app.manifest)
    ));

    let unit_registered = app.service_unit.as_ref().map(|unit| {
        runner.check(&format!(
            "systemctl list-unit-files | grep -q {}",
            shell::quote_arg(&format!("^{}", unit)),
        ))
    });

    Ok(StatusReport {
        app_id: app.id.clone(),
        target: runner.target(),
        remote_path,
        workcopy_present,
        current_branch,
        venv_present,
        manifest_present,
        service_unit: app.service_unit.clone(),
        unit_registered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::CommandOutput;

    fn sample_app() -> App {
        serde_json::from_str(
            r#"{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp",
                "serviceUnit": "flaskapp.service"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn reports_full_state_when_everything_present() {
        let runner = ScriptedRunner::new().respond(
            "rev-parse --abbrev-ref",
            CommandOutput {
                stdout: "main\n".to_string(),
                stderr: String::new(),
                success: true,
                exit_code: 0,
            },
        );
        let report = inspect(&runner, &sample_app()).unwrap();

        assert!(report.workcopy_present);
        assert_eq!(report.current_branch.as_deref(), Some("main"));
        assert!(report.venv_present);
        assert!(report.manifest_present);
        assert_eq!(report.unit_registered, Some(true));
    }

    #[test]
    fn skips_branch_query_without_workcopy() {
        let runner = ScriptedRunner::new().respond(
            "[ -d '/home/deploy/flaskapp'/.git ]",
            CommandOutput {
                stdout: String::new(),
                stderr: String::new(),
                success: false,
                exit_code: 1,
            },
        );
        let report = inspect(&runner, &sample_app()).unwrap();

        assert!(!report.workcopy_present);
        assert!(report.current_branch.is_none());
        assert!(!runner.ran("rev-parse"));
    }

    #[test]
    fn unit_check_absent_without_service_unit() {
        let mut app = sample_app();
        app.service_unit = None;
        let runner = ScriptedRunner::new();
        let report = inspect(&runner, &app).unwrap();
        assert!(report.unit_registered.is_none());
        assert!(!runner.ran("list-unit-files"));
    }
}
