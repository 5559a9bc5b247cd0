use clap::Args;
use serde::Serialize;

use pullman::deploy::{self, DeployReport};

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// App ID
    pub app_id: String,

    /// Branch to deploy (defaults to the app's branch)
    #[arg(long)]
    pub branch: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: DeployReport,
}

pub fn run(args: DeployArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DeployOutput> {
    let report = deploy::run(&args.app_id, args.branch.as_deref())?;

    Ok((
        DeployOutput {
            command: "deploy.run".to_string(),
            report,
        },
        0,
    ))
}
