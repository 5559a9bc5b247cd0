use clap::Args;
use serde::Serialize;

use pullman::repo::{self, RepoSpec, WorkcopyOutcome, WorkcopyStrategy};
use pullman::runner::LocalRunner;
use pullman::utils::command;
use pullman::{app, Error};

use super::CmdResult;

#[derive(Args)]
pub struct CheckoutArgs {
    /// App ID
    pub app_id: String,

    /// Branch to check out (defaults to the app's branch)
    #[arg(long)]
    pub branch: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutput {
    pub command: String,
    pub app_id: String,
    pub branch: String,
    pub workdir: String,
    pub outcome: WorkcopyOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

pub fn run(args: CheckoutArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<CheckoutOutput> {
    let app = app::load(&args.app_id)?;
    let branch = args.branch.unwrap_or_else(|| app.branch.clone());

    let workdir_path = app.workdir()?;
    if let Some(parent) = workdir_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::internal_io(e.to_string(), Some("create workspace root".to_string()))
        })?;
    }
    let workdir = workdir_path.to_string_lossy().to_string();

    let spec = RepoSpec {
        url: app.repo_url.clone(),
        branch: branch.clone(),
        target_dir: workdir.clone(),
    };
    let outcome = repo::ensure_at_branch(&LocalRunner::new(), &spec, WorkcopyStrategy::FreshClone)?;
    let revision = command::git_revision(&workdir);

    Ok((
        CheckoutOutput {
            command: "checkout.run".to_string(),
            app_id: args.app_id,
            branch,
            workdir,
            outcome,
            revision,
        },
        0,
    ))
}
