//! Pipeline orchestration: checkout → build → test → deploy.
//!
//! Control flow is strictly linear. A stage failure ends the run unless the
//! stage's own policy suppresses it (test stage) or degrades it to a warning
//! (service restart inside deploy). Overlapping runs against the same target
//! are not serialized here; the external trigger owns that behavior.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::app::{self, App};
use crate::deploy::{self, DeployReport};
use crate::error::{Error, Result};
use crate::pyenv::{self, ManifestPolicy};
use crate::repo::{self, RepoSpec, WorkcopyStrategy};
use crate::runner::{LocalRunner, RemoteRunner};
use crate::server;
use crate::ssh::SshClient;
use crate::testrun;
use crate::utils::command;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Checkout,
    Build,
    Test,
    Deploy,
}

pub const ALL_STAGES: [Stage; 4] = [Stage::Checkout, Stage::Build, Stage::Test, Stage::Deploy];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Passed,
    Failed,
    /// Stage failed but its failure policy lets the pipeline continue.
    Suppressed,
    Skipped,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageReport {
    fn passed(stage: Stage) -> Self {
        Self {
            stage,
            status: StageStatus::Passed,
            error_code: None,
            detail: None,
        }
    }

    fn failed(stage: Stage, err: &Error) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            error_code: Some(err.code.as_str().to_string()),
            detail: Some(err.message.clone()),
        }
    }

    fn with_status(stage: Stage, status: StageStatus) -> Self {
        Self {
            stage,
            status,
            error_code: None,
            detail: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub app_id: String,
    pub branch: String,
    pub started_at: String,
    pub finished_at: String,
    pub success: bool,
    /// True when the branch gate rejected the branch and nothing ran.
    pub gate_skipped: bool,
    pub dry_run: bool,
    /// Revision checked out locally, once the checkout stage has run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub stages: Vec<StageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deploy: Option<DeployReport>,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
    pub branch: Option<String>,
    pub dry_run: bool,
}

/// Run the full pipeline for an app.
pub fn run(app_id: &str, options: &PipelineOptions) -> Result<PipelineReport> {
    let mut app = app::load(app_id)?;
    let branch = options
        .branch
        .clone()
        .unwrap_or_else(|| app.branch.clone());

    let run_id = Uuid::new_v4();
    let started_at = Utc::now().to_rfc3339();

    // Branch gate: a rejected branch skips the run entirely, mirroring a
    // workflow that only triggers on named branches.
    if !app.branch_allowed(&branch) {
        log_status!(
            "pipeline",
            "Branch '{}' not in gate {:?}, skipping run",
            branch,
            app.branches
        );
        return Ok(PipelineReport {
            run_id,
            app_id: app.id.clone(),
            branch,
            started_at: started_at.clone(),
            finished_at: started_at,
            success: true,
            gate_skipped: true,
            dry_run: options.dry_run,
            revision: None,
            stages: ALL_STAGES
                .iter()
                .map(|s| StageReport::with_status(*s, StageStatus::Skipped))
                .collect(),
            deploy: None,
        });
    }

    if options.dry_run {
        return Ok(PipelineReport {
            run_id,
            app_id: app.id.clone(),
            branch,
            started_at: started_at.clone(),
            finished_at: started_at,
            success: true,
            gate_skipped: false,
            dry_run: true,
            revision: None,
            stages: ALL_STAGES
                .iter()
                .map(|s| StageReport::with_status(*s, StageStatus::Planned))
                .collect(),
            deploy: None,
        });
    }

    let mut stages: Vec<StageReport> = Vec::new();
    let mut fatal: Option<Error> = None;
    let mut deploy_report: Option<DeployReport> = None;

    let workdir_path = app.workdir()?;
    let workdir = workdir_path.to_string_lossy().to_string();
    let local = LocalRunner::new();

    // Checkout: fresh clone keyed by the app directory name.
    let spec = RepoSpec {
        url: app.repo_url.clone(),
        branch: branch.clone(),
        target_dir: workdir.clone(),
    };
    let mut revision = None;
    match repo::ensure_at_branch(&local, &spec, WorkcopyStrategy::FreshClone) {
        Ok(_) => {
            revision = command::git_revision(&workdir);
            stages.push(StageReport::passed(Stage::Checkout));
        }
        Err(err) => {
            stages.push(StageReport::failed(Stage::Checkout, &err));
            fatal = Some(err);
        }
    }

    // Repo-local overrides become visible once the source is checked out.
    if fatal.is_none() {
        match app::load_repo_overrides(&workdir_path) {
            Ok(Some(overrides)) => app::apply_repo_overrides(&mut app, &overrides),
            Ok(None) => {}
            Err(err) => {
                stages.push(StageReport::failed(Stage::Build, &err));
                fatal = Some(err);
            }
        }
    }

    // Build
    if fatal.is_none() {
        match pyenv::provision(&local, &app, &workdir, ManifestPolicy::WarnIfMissing) {
            Ok(_) => stages.push(StageReport::passed(Stage::Build)),
            Err(err) => {
                stages.push(StageReport::failed(Stage::Build, &err));
                fatal = Some(err);
            }
        }
    }

    // Test
    if fatal.is_none() {
        match testrun::run_suite(&local, &app, &workdir) {
            Ok(report) if report.success => stages.push(StageReport::passed(Stage::Test)),
            Ok(report) => stages.push(StageReport {
                stage: Stage::Test,
                status: StageStatus::Suppressed,
                error_code: None,
                detail: Some(format!("test suite failed (exit {})", report.exit_code)),
            }),
            Err(err) => {
                stages.push(StageReport::failed(Stage::Test, &err));
                fatal = Some(err);
            }
        }
    }

    // Deploy
    if fatal.is_none() {
        match run_deploy_stage(&app, &branch) {
            Ok(report) => {
                stages.push(StageReport::passed(Stage::Deploy));
                deploy_report = Some(report);
            }
            Err(err) => {
                stages.push(StageReport::failed(Stage::Deploy, &err));
                fatal = Some(err);
            }
        }
    }

    Ok(PipelineReport {
        run_id,
        app_id: app.id.clone(),
        branch,
        started_at,
        finished_at: Utc::now().to_rfc3339(),
        success: fatal.is_none(),
        gate_skipped: false,
        dry_run: false,
        revision,
        stages,
        deploy: deploy_report,
    })
}

fn run_deploy_stage(app: &App, branch: &str) -> Result<DeployReport> {
    let server = server::resolve(app.server_id.as_deref())?;
    let client = SshClient::from_server(&server, &server.id)?;
    let runner = RemoteRunner::new(&client);
    deploy::deploy(&runner, app, branch)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gated_app() -> App {
        serde_json::from_str(
            r#"{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp",
                "branches": ["staging", "main"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn all_stages_are_ordered() {
        assert_eq!(
            ALL_STAGES,
            [Stage::Checkout, Stage::Build, Stage::Test, Stage::Deploy]
        );
    }

    #[test]
    fn gate_admits_listed_branches_only() {
        let app = gated_app();
        assert!(app.branch_allowed("staging"));
        assert!(!app.branch_allowed("feature/widget"));
    }

    #[test]
    fn stage_report_serialization() {
        let report = StageReport::with_status(Stage::Checkout, StageStatus::Planned);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stage"], "checkout");
        assert_eq!(json["status"], "planned");
    }
}
