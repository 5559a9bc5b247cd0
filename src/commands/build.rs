use clap::Args;
use serde::Serialize;

use pullman::pyenv::{self, EnvReport, ManifestPolicy};
use pullman::runner::LocalRunner;
use pullman::{app, Error};

use super::CmdResult;

#[derive(Args)]
pub struct BuildArgs {
    /// App ID
    pub app_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub command: String,
    pub app_id: String,
    pub workdir: String,
    #[serde(flatten)]
    pub env: EnvReport,
}

/// Resolve the app with repo-local overrides and its checked-out workdir.
pub(crate) fn load_checked_out(app_id: &str) -> pullman::Result<(pullman::app::App, String)> {
    let mut app = app::load(app_id)?;
    let workdir_path = app.workdir()?;

    if !workdir_path.is_dir() {
        return Err(Error::validation_invalid_argument(
            "workdir",
            format!("No working copy at {}", workdir_path.display()),
            Some(app_id.to_string()),
        )
        .with_hint(format!("Run 'pullman checkout {}' first", app_id)));
    }

    if let Some(overrides) = app::load_repo_overrides(&workdir_path)? {
        app::apply_repo_overrides(&mut app, &overrides);
    }

    Ok((app, workdir_path.to_string_lossy().to_string()))
}

pub fn run(args: BuildArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<BuildOutput> {
    let (app, workdir) = load_checked_out(&args.app_id)?;

    let env = pyenv::provision(
        &LocalRunner::new(),
        &app,
        &workdir,
        ManifestPolicy::WarnIfMissing,
    )?;

    Ok((
        BuildOutput {
            command: "build.run".to_string(),
            app_id: args.app_id,
            workdir,
            env,
        },
        0,
    ))
}
