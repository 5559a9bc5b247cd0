use clap::Args;
use serde::Serialize;

use pullman::pipeline::{self, PipelineOptions, PipelineReport};

use super::CmdResult;

#[derive(Args)]
pub struct RunArgs {
    /// App ID
    pub app_id: String,

    /// Branch to run the pipeline for (defaults to the app's branch)
    #[arg(long)]
    pub branch: Option<String>,

    /// Print the planned stages without executing
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Serialize)]
pub struct RunOutput {
    pub command: String,
    #[serde(flatten)]
    pub report: PipelineReport,
}

pub fn run(args: RunArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let options = PipelineOptions {
        branch: args.branch,
        dry_run: args.dry_run,
    };

    let report = pipeline::run(&args.app_id, &options)?;
    let exit_code = if report.success { 0 } else { 1 };

    Ok((
        RunOutput {
            command: "pipeline.run".to_string(),
            report,
        },
        exit_code,
    ))
}
