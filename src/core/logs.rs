//! Application log viewing on the deploy target.
//!
//! Routes to journalctl for the service strategy and to the nohup log file
//! for the detached-process strategy.

use serde::Serialize;

use crate::app::{self, App};
use crate::error::{Error, RemoteCommandFailedDetails, Result};
use crate::runner::{CommandRunner, RemoteRunner};
use crate::server;
use crate::ssh::SshClient;
use crate::utils::shell;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogContent {
    pub app_id: String,
    pub source: String,
    pub lines: u32,
    pub content: String,
}

/// Show the last `lines` of application output.
pub fn show(app_id: &str, lines: u32) -> Result<LogContent> {
    let app = app::load(app_id)?;
    let server = server::resolve(app.server_id.as_deref())?;
    let client = SshClient::from_server(&server, &server.id)?;
    let runner = RemoteRunner::new(&client);
    tail(&runner, &app, lines)
}

pub fn tail(runner: &dyn CommandRunner, app: &App, lines: u32) -> Result<LogContent> {
    let (source, command) = match &app.service_unit {
        Some(unit) => (
            unit.clone(),
            format!(
                "journalctl -u {} -n {} --no-pager",
                shell::quote_arg(unit),
                lines
            ),
        ),
        None => {
            let path = format!("{}/{}", app.effective_remote_path(), app.log_file);
            (
                path.clone(),
                format!("tail -n {} {}", lines, shell::quote_path(&path)),
            )
        }
    };

    let output = runner.run(&command);
    if !output.success {
        return Err(Error::remote_command_failed(RemoteCommandFailedDetails {
            command,
            exit_code: output.exit_code,
            stdout: output.stdout,
            stderr: output.stderr,
            host: Some(runner.target()),
        }));
    }

    Ok(LogContent {
        app_id: app.id.clone(),
        source,
        lines,
        content: output.stdout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;

    fn app_json(extra: &str) -> App {
        serde_json::from_str(&format!(
            r#"{{
                "repoUrl": "git@github.com:acme/flaskapp.git",
                "remotePath": "/home/deploy/flaskapp"{}
            }}"#,
            extra
        ))
        .unwrap()
    }

    #[test]
    fn service_strategy_uses_journalctl() {
        let app = app_json(r#", "serviceUnit": "flaskapp.service""#);
        let runner = ScriptedRunner::new();
        let content = tail(&runner, &app, 50).unwrap();
        assert!(runner.ran("journalctl -u flaskapp.service -n 50 --no-pager"));
        assert_eq!(content.source, "flaskapp.service");
    }

    #[test]
    fn process_strategy_tails_log_file() {
        let app = app_json("");
        let runner = ScriptedRunner::new();
        let content = tail(&runner, &app, 100).unwrap();
        assert!(runner.ran("tail -n 100 '/home/deploy/flaskapp/app.log'"));
        assert_eq!(content.source, "/home/deploy/flaskapp/app.log");
    }
}
