//! Remote deploy: pull source on the target host, re-provision the
//! dependency environment, and restart the application.
//!
//! Each run walks a fixed sequence of phases with a single early-exit
//! failure path. The restart step is the exception: for the service
//! strategy it is guarded and degrades to a warning instead of aborting.

use serde::Serialize;

use crate::app::{self, App};
use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::pyenv;
use crate::repo::{self, RepoSpec, WorkcopyOutcome, WorkcopyStrategy};
use crate::runner::{CommandRunner, RemoteRunner};
use crate::server;
use crate::ssh::SshClient;
use crate::utils::shell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployPhase {
    DirectoryReady,
    RepoReady,
    EnvReady,
    ManifestVerified,
    ServiceRestarted,
    ProcessStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartKind {
    /// Named systemd unit was restarted.
    Service,
    /// Fresh detached process was started. No duplicate-process guard and
    /// no prior-instance termination.
    Process,
    /// Unit not registered; nothing restarted, warning recorded.
    SkippedUnitMissing,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestartOutcome {
    pub kind: RestartKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployReport {
    pub app_id: String,
    pub branch: String,
    pub remote_path: String,
    pub target: String,
    pub workcopy: WorkcopyOutcome,
    pub phases: Vec<DeployPhase>,
    pub restart: RestartOutcome,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// High-level deploy entry point. Resolves app, credentials, and repo-local
/// overrides, then runs the phase sequence over SSH.
pub fn run(app_id: &str, branch_override: Option<&str>) -> Result<DeployReport> {
    let mut app = app::load(app_id)?;

    // Repo-local overrides travel with the checked-out source.
    if let Ok(workdir) = app.workdir() {
        if let Some(overrides) = app::load_repo_overrides(&workdir)? {
            app::apply_repo_overrides(&mut app, &overrides);
        }
    }

    let server = server::resolve(app.server_id.as_deref())?;
    let client = SshClient::from_server(&server, &server.id)?;
    let runner = RemoteRunner::new(&client);

    let branch = branch_override.unwrap_or(&app.branch).to_string();
    deploy(&runner, &app, &branch)
}

/// Execute the deploy phase sequence through the given runner.
pub fn deploy(runner: &dyn CommandRunner, app: &App, branch: &str) -> Result<DeployReport> {
    let remote_path = app.effective_remote_path();
    let mut phases = Vec::new();
    let mut warnings = Vec::new();

    // Phase 1: target directory
    eprintln!("[deploy] Ensuring directory: {}", remote_path);
    let mkdir = runner.run(&format!("mkdir -p {}", shell::quote_path(&remote_path)));
    if !mkdir.success {
        return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command: format!("mkdir -p {}", remote_path),
            exit_code: mkdir.exit_code,
            stdout: mkdir.stdout,
            stderr: mkdir.stderr,
            host: Some(runner.target()),
        }));
    }
    phases.push(DeployPhase::DirectoryReady);

    // Phase 2: working copy (clone-if-absent, else pull)
    let spec = RepoSpec {
        url: app.repo_url.clone(),
        branch: branch.to_string(),
        target_dir: remote_path.clone(),
    };
    let workcopy = repo::ensure_at_branch(
        runner,
        &spec,
        WorkcopyStrategy::CloneOrPull {
            create_branch: app.create_missing_branch,
        },
    )?;
    phases.push(DeployPhase::RepoReady);

    // Phase 3: dependency environment
    pyenv::ensure_python(runner, app)?;
    pyenv::ensure_venv(runner, app, &remote_path)?;
    pyenv::upgrade_pip(runner, app, &remote_path)?;
    phases.push(DeployPhase::EnvReady);

    // Phase 4: manifest is the sole source of truth for installed packages;
    // its absence is fatal here.
    if !pyenv::manifest_exists(runner, app, &remote_path) {
        let err = Error::deploy_manifest_missing(app.manifest.clone());
        eprintln!("{}", err.message);
        return Err(err);
    }
    phases.push(DeployPhase::ManifestVerified);
    pyenv::install_manifest(runner, app, &remote_path)?;

    // Phase 5: restart
    let restart = match (&app.service_unit, &app.start_command) {
        (Some(unit), _) => restart_service(runner, unit, &mut warnings)?,
        (None, Some(command)) => start_process(runner, app, &remote_path, command)?,
        (None, None) => return Err(Error::deploy_restart_invalid(app.id.clone())),
    };
    phases.push(match restart.kind {
        RestartKind::Service => DeployPhase::ServiceRestarted,
        RestartKind::Process => DeployPhase::ProcessStarted,
        RestartKind::SkippedUnitMissing => DeployPhase::ServiceRestarted,
    });

    eprintln!("[deploy] Deploy complete for {}", remote_path);
    Ok(DeployReport {
        app_id: app.id.clone(),
        branch: branch.to_string(),
        remote_path,
        target: runner.target(),
        workcopy,
        phases,
        restart,
        warnings,
    })
}

/// Restart a systemd unit, but only if it is registered. A missing unit or
/// a failed restart degrades to a warning; the run still succeeds and the
/// process is left in its previous state.
fn restart_service(
    runner: &dyn CommandRunner,
    unit: &str,
    warnings: &mut Vec<String>,
) -> Result<RestartOutcome> {
    let registered = runner.check(&format!(
        "systemctl list-unit-files | grep -q {}",
        shell::quote_arg(&format!("^{}", unit)),
    ));

    if !registered {
        let warning = format!("Warning: {} not found. Ensure it's set up.", unit);
        eprintln!("{}", warning);
        warnings.push(warning);
        return Ok(RestartOutcome {
            kind: RestartKind::SkippedUnitMissing,
            service_unit: Some(unit.to_string()),
            start_command: None,
        });
    }

    eprintln!("[deploy] Restarting {}", unit);
    let restart = runner.run(&format!("sudo systemctl restart {}", shell::quote_arg(unit)));
    if !restart.success {
        let warning = format!(
            "Warning: failed to restart {}: {}",
            unit,
            restart.stderr.trim()
        );
        eprintln!("{}", warning);
        warnings.push(warning);
    }

    Ok(RestartOutcome {
        kind: RestartKind::Service,
        service_unit: Some(unit.to_string()),
        start_command: None,
    })
}

/// Start the configured command as a fresh detached process with the venv
/// bin directory on PATH, output appended to the app log.
fn start_process(
    runner: &dyn CommandRunner,
    app: &App,
    remote_path: &str,
    command: &str,
) -> Result<RestartOutcome> {
    eprintln!("[deploy] Starting detached process: {}", command);
    let launch = format!(
        "cd {} && PATH={}/bin:$PATH nohup {} >> {} 2>&1 < /dev/null &",
        shell::quote_path(remote_path),
        shell::quote_arg(&app.venv_dir),
        command,
        shell::quote_arg(&app.log_file),
    );

    let output = runner.run(&launch);
    if !output.success {
        return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command: launch,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            host: Some(runner.target()),
        }));
    }

    Ok(RestartOutcome {
        kind: RestartKind::Process,
        service_unit: None,
        start_command: Some(command.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use crate::ssh::CommandOutput;

    fn missing() -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: String::new(),
            success: false,
            exit_code: 1,
        }
    }

    fn service_app() -> App {
        serde_json::from_str(
            r#"{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp",
                "serviceUnit": "flaskapp.service"
            }"#,
        )
        .unwrap()
    }

    fn process_app() -> App {
        serde_json::from_str(
            r#"{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp",
                "startCommand": "python app.py"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn deploy_walks_all_phases_with_service_restart() {
        let runner = ScriptedRunner::new();
        let app = service_app();
        let report = deploy(&runner, &app, "main").unwrap();

        assert_eq!(
            report.phases,
            vec![
                DeployPhase::DirectoryReady,
                DeployPhase::RepoReady,
                DeployPhase::EnvReady,
                DeployPhase::ManifestVerified,
                DeployPhase::ServiceRestarted,
            ]
        );
        assert_eq!(report.workcopy, WorkcopyOutcome::Updated);
        assert_eq!(report.restart.kind, RestartKind::Service);
        assert!(report.warnings.is_empty());
        assert!(runner.ran("sudo systemctl restart flaskapp.service"));
    }

    #[test]
    fn deploy_clones_on_first_run() {
        let runner = ScriptedRunner::new().respond("[ -d '/home/deploy/flaskapp'/.git ]", missing());
        let report = deploy(&runner, &service_app(), "main").unwrap();
        assert_eq!(report.workcopy, WorkcopyOutcome::Cloned);
        assert!(runner.ran("git clone --branch main"));
    }

    #[test]
    fn missing_manifest_aborts_before_install_and_restart() {
        let runner = ScriptedRunner::new().respond("[ -f requirements.txt ]", missing());
        let err = deploy(&runner, &service_app(), "main").unwrap_err();

        assert_eq!(err.message, "ERROR: requirements.txt not found!");
        assert!(!runner.ran("pip install -r"));
        assert!(!runner.ran("systemctl restart"));
    }

    #[test]
    fn unregistered_unit_degrades_to_warning() {
        let runner = ScriptedRunner::new().respond("list-unit-files", missing());
        let report = deploy(&runner, &service_app(), "main").unwrap();

        assert_eq!(report.restart.kind, RestartKind::SkippedUnitMissing);
        assert_eq!(
            report.warnings,
            vec!["Warning: flaskapp.service not found. Ensure it's set up.".to_string()]
        );
        assert!(!runner.ran("systemctl restart"));
    }

    #[test]
    fn failed_service_restart_degrades_to_warning() {
        let runner = ScriptedRunner::new().fail_on("systemctl restart", "job failed");
        let report = deploy(&runner, &service_app(), "main").unwrap();

        assert_eq!(report.restart.kind, RestartKind::Service);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("failed to restart flaskapp.service"));
    }

    #[test]
    fn process_strategy_starts_detached() {
        let runner = ScriptedRunner::new();
        let report = deploy(&runner, &process_app(), "main").unwrap();

        assert_eq!(report.restart.kind, RestartKind::Process);
        assert!(runner.ran("nohup python app.py >> app.log 2>&1 < /dev/null &"));
        assert!(!runner.ran("systemctl"));
    }

    #[test]
    fn no_restart_strategy_is_rejected() {
        let mut app = process_app();
        app.start_command = None;
        let runner = ScriptedRunner::new();
        let err = deploy(&runner, &app, "main").unwrap_err();
        assert_eq!(err.code.as_str(), "deploy.restart_invalid");
    }

    #[test]
    fn clone_failure_aborts_remaining_phases() {
        let runner = ScriptedRunner::new()
            .respond("[ -d '/home/deploy/flaskapp'/.git ]", missing())
            .fail_on("git clone", "connection refused");
        let err = deploy(&runner, &service_app(), "main").unwrap_err();

        assert_eq!(err.code.as_str(), "checkout.failed");
        assert!(!runner.ran("pip install"));
    }

    #[test]
    fn service_unit_takes_precedence_over_start_command() {
        let mut app = service_app();
        app.start_command = Some("python app.py".to_string());
        let runner = ScriptedRunner::new();
        let report = deploy(&runner, &app, "main").unwrap();
        assert_eq!(report.restart.kind, RestartKind::Service);
        assert!(!runner.ran("nohup"));
    }
}
