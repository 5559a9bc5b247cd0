use clap::Args;
use serde::Serialize;

use pullman::status::{self, StatusReport};

use super::CmdResult;

#[derive(Args)]
pub struct StatusArgs {
    /// App ID
    pub app_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: StatusReport,
}

pub fn run(args: StatusArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<StatusOutput> {
    let report = status::run(&args.app_id)?;

    Ok((
        StatusOutput {
            command: "status.run".to_string(),
            report,
        },
        0,
    ))
}
