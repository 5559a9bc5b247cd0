use clap::Args;
use serde::Serialize;

use pullman::logs::{self, LogContent};

use super::CmdResult;

#[derive(Args)]
pub struct LogsArgs {
    /// App ID
    pub app_id: String,

    /// Number of lines to show
    #[arg(long, short = 'n', default_value_t = 100)]
    pub lines: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsOutput {
    pub command: String,
    #[serde(flatten)]
    pub content: LogContent,
}

pub fn run(args: LogsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<LogsOutput> {
    let content = logs::show(&args.app_id, args.lines)?;

    Ok((
        LogsOutput {
            command: "logs.show".to_string(),
            content,
        },
        0,
    ))
}
