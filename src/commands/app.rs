use clap::{Args, Subcommand};
use serde::Serialize;

use pullman::app::{self, App, TestFailureMode};
use pullman::Error;

use super::CmdResult;

#[derive(Args)]
pub struct AppArgs {
    #[command(subcommand)]
    pub subcommand: AppSubcommand,
}

#[derive(Subcommand)]
pub enum AppSubcommand {
    /// Register a new app
    Add(AddArgs),
    /// List configured apps
    List,
    /// Show an app's configuration
    Show { app_id: String },
    /// Update fields on an existing app
    Set(SetArgs),
    /// Remove an app
    Remove { app_id: String },
}

#[derive(Args)]
pub struct AddArgs {
    /// App ID
    pub app_id: String,

    /// Clone URL of the application repository
    #[arg(long)]
    pub repo_url: String,

    /// Target directory on the remote host
    #[arg(long)]
    pub remote_path: String,

    #[command(flatten)]
    pub fields: FieldArgs,
}

#[derive(Args)]
pub struct SetArgs {
    /// App ID
    pub app_id: String,

    /// Clone URL of the application repository
    #[arg(long)]
    pub repo_url: Option<String>,

    /// Target directory on the remote host
    #[arg(long)]
    pub remote_path: Option<String>,

    #[command(flatten)]
    pub fields: FieldArgs,
}

/// Optional fields shared by `add` and `set`.
#[derive(Args, Default)]
pub struct FieldArgs {
    /// Branch deployed by default
    #[arg(long)]
    pub branch: Option<String>,

    /// Server entity providing SSH credentials
    #[arg(long)]
    pub server: Option<String>,

    /// Dependency manifest file
    #[arg(long)]
    pub manifest: Option<String>,

    /// Virtual environment directory
    #[arg(long)]
    pub venv_dir: Option<String>,

    /// Python interpreter
    #[arg(long)]
    pub python: Option<String>,

    /// Systemd unit restarted after deploy
    #[arg(long)]
    pub service_unit: Option<String>,

    /// Command started detached after deploy
    #[arg(long)]
    pub start_command: Option<String>,

    /// Log file for the detached process
    #[arg(long)]
    pub log_file: Option<String>,

    /// Branch gate (comma-separated; empty string clears the gate)
    #[arg(long)]
    pub branches: Option<String>,

    /// Test failure mode: 'suppress' or 'fatal'
    #[arg(long)]
    pub test_failure: Option<String>,

    /// Test runner override
    #[arg(long)]
    pub test_command: Option<String>,

    /// Base directory for local working copies
    #[arg(long)]
    pub local_root: Option<String>,

    /// Create a locally-missing branch during clone-or-pull
    #[arg(long)]
    pub create_missing_branch: Option<bool>,
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AppOutput {
    Saved { app: App },
    List { apps: Vec<App> },
    Show { app: App },
    Removed { app_id: String },
}

fn parse_test_failure(value: &str) -> pullman::Result<TestFailureMode> {
    match value {
        "suppress" => Ok(TestFailureMode::Suppress),
        "fatal" => Ok(TestFailureMode::Fatal),
        other => Err(Error::validation_invalid_argument(
            "test_failure",
            format!("Expected 'suppress' or 'fatal', got '{}'", other),
            None,
        )),
    }
}

fn apply_fields(app: &mut App, fields: &FieldArgs) -> pullman::Result<()> {
    if let Some(ref v) = fields.branch {
        app.branch = v.clone();
    }
    if let Some(ref v) = fields.server {
        app.server_id = Some(v.clone());
    }
    if let Some(ref v) = fields.manifest {
        app.manifest = v.clone();
    }
    if let Some(ref v) = fields.venv_dir {
        app.venv_dir = v.clone();
    }
    if let Some(ref v) = fields.python {
        app.python = v.clone();
    }
    if let Some(ref v) = fields.service_unit {
        app.service_unit = Some(v.clone());
    }
    if let Some(ref v) = fields.start_command {
        app.start_command = Some(v.clone());
    }
    if let Some(ref v) = fields.log_file {
        app.log_file = v.clone();
    }
    if let Some(ref v) = fields.branches {
        app.branches = v
            .split(',')
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .collect();
    }
    if let Some(ref v) = fields.test_failure {
        app.test_failure = parse_test_failure(v)?;
    }
    if let Some(ref v) = fields.test_command {
        app.test_command = Some(v.clone());
    }
    if let Some(ref v) = fields.local_root {
        app.local_root = Some(v.clone());
    }
    if let Some(v) = fields.create_missing_branch {
        app.create_missing_branch = v;
    }
    Ok(())
}

pub fn run(args: AppArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<AppOutput> {
    match args.subcommand {
        AppSubcommand::Add(add) => {
            let mut entity: App = serde_json::from_value(serde_json::json!({
                "repoUrl": add.repo_url,
                "remotePath": add.remote_path,
            }))
            .map_err(|e| Error::internal_json(e.to_string(), Some("build app".to_string())))?;
            entity.id = add.app_id;
            apply_fields(&mut entity, &add.fields)?;

            let app = app::create(entity)?;
            Ok((AppOutput::Saved { app }, 0))
        }
        AppSubcommand::List => {
            let apps = app::list()?;
            Ok((AppOutput::List { apps }, 0))
        }
        AppSubcommand::Show { app_id } => {
            let app = app::load(&app_id)?;
            Ok((AppOutput::Show { app }, 0))
        }
        AppSubcommand::Set(set) => {
            let mut app = app::load(&set.app_id)?;
            if let Some(ref v) = set.repo_url {
                app.repo_url = v.clone();
            }
            if let Some(ref v) = set.remote_path {
                app.remote_path = v.clone();
            }
            apply_fields(&mut app, &set.fields)?;
            app::save(&app)?;
            Ok((AppOutput::Saved { app }, 0))
        }
        AppSubcommand::Remove { app_id } => {
            app::delete(&app_id)?;
            Ok((AppOutput::Removed { app_id }, 0))
        }
    }
}
