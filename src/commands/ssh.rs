use clap::Args;
use serde::Serialize;

use pullman::ssh::SshClient;
use pullman::utils::shell;
use pullman::{app, server};

use super::CmdResult;

#[derive(Args)]
pub struct SshArgs {
    /// Target ID (app or server; app wins when ambiguous)
    pub target: String,

    /// Command to execute (omit for interactive shell).
    ///
    /// Examples:
    ///   pullman ssh flaskapp -- ls -la
    ///   pullman ssh flaskapp "cd /home/deploy/flaskapp && tail app.log"
    #[arg(num_args = 0.., trailing_var_arg = true)]
    pub command: Vec<String>,

    /// Force interpretation as server ID
    #[arg(long)]
    pub as_server: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SshOutput {
    pub resolved_type: String,
    pub server_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    pub success: bool,
}

/// Whether this invocation opens an interactive session.
pub fn is_interactive(args: &SshArgs) -> bool {
    args.command.is_empty()
}

struct ResolvedTarget {
    resolved_type: String,
    server: server::Server,
    /// App remote path, used to start the session in the working copy.
    base_path: Option<String>,
}

fn resolve_target(args: &SshArgs) -> pullman::Result<ResolvedTarget> {
    if !args.as_server {
        if let Ok(app) = app::load(&args.target) {
            let srv = server::resolve(app.server_id.as_deref())?;
            return Ok(ResolvedTarget {
                resolved_type: "app".to_string(),
                server: srv,
                base_path: Some(app.effective_remote_path()),
            });
        }
    }

    let srv = server::load(&args.target)?;
    Ok(ResolvedTarget {
        resolved_type: "server".to_string(),
        server: srv,
        base_path: None,
    })
}

pub fn run(args: SshArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<SshOutput> {
    let resolved = resolve_target(&args)?;

    let command_string: Option<String> = if args.command.is_empty() {
        None
    } else if args.command.len() == 1 {
        // A single string is treated as a raw shell command.
        Some(args.command[0].clone())
    } else {
        // Multi-arg form (typically from `-- <cmd...>`): quote args safely.
        Some(shell::quote_args(&args.command))
    };

    // App targets start in the remote working copy.
    let effective_command = match (&resolved.base_path, &command_string) {
        (Some(bp), Some(cmd)) => Some(format!("cd {} && {}", shell::quote_path(bp), cmd)),
        (Some(bp), None) => Some(format!("cd {}", shell::quote_path(bp))),
        (None, cmd) => cmd.clone(),
    };

    let client = SshClient::from_server(&resolved.server, &resolved.server.id)?;

    if !args.command.is_empty() {
        // Non-interactive: capture output for JSON response
        let cmd = effective_command.as_deref().unwrap_or_default();
        let output = client.execute(cmd);

        Ok((
            SshOutput {
                resolved_type: resolved.resolved_type,
                server_id: resolved.server.id.clone(),
                command: command_string,
                stdout: Some(output.stdout),
                stderr: Some(output.stderr),
                success: output.success,
            },
            output.exit_code,
        ))
    } else {
        // Interactive: TTY passthrough
        let exit_code = client.execute_interactive(effective_command.as_deref());

        Ok((
            SshOutput {
                resolved_type: resolved.resolved_type,
                server_id: resolved.server.id.clone(),
                command: None,
                stdout: None,
                stderr: None,
                success: exit_code == 0,
            },
            exit_code,
        ))
    }
}
