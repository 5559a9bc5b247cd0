//! Dependency environment provisioning.
//!
//! Creates and synchronizes an isolated Python environment against the
//! dependency manifest, locally for the build stage and remotely during
//! deploy. Granular steps are exposed so deploy can interleave its own
//! phase tracking; `provision` composes them for the build stage.

use serde::Serialize;

use crate::app::App;
use crate::error::{Error, Result};
use crate::runner::CommandRunner;
use crate::utils::shell;

/// What a missing manifest means to the caller.
///
/// At build/test time the manifest is a warning-worthy gap; at deploy time
/// its absence is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestPolicy {
    WarnIfMissing,
    Required,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvReport {
    pub venv_created: bool,
    pub manifest_present: bool,
    pub installed: bool,
}

/// Shell path of the venv's bin directory relative to the working copy.
fn venv_bin(app: &App, tool: &str) -> String {
    format!("{}/bin/{}", app.venv_dir, tool)
}

/// Verify the interpreter exists on the execution target.
pub fn ensure_python(runner: &dyn CommandRunner, app: &App) -> Result<()> {
    let check = format!("command -v {}", shell::quote_arg(&app.python));
    if !runner.check(&check) {
        return Err(Error::build_env_failed(format!(
            "{} not found on {}",
            app.python,
            runner.target()
        )));
    }
    Ok(())
}

/// Create the venv if missing. Returns true when a new one was created.
pub fn ensure_venv(runner: &dyn CommandRunner, app: &App, workdir: &str) -> Result<bool> {
    let dir = shell::quote_path(workdir);
    let venv = shell::quote_arg(&app.venv_dir);

    if runner.check(&format!("cd {} && [ -d {} ]", dir, venv)) {
        return Ok(false);
    }

    log_status!("build", "Creating virtual environment in {}", app.venv_dir);
    let create = runner.run(&format!(
        "cd {} && {} -m venv {}",
        dir,
        shell::quote_arg(&app.python),
        venv,
    ));
    if !create.success {
        return Err(Error::build_env_failed(format!(
            "venv creation failed: {}",
            create.stderr.trim()
        )));
    }
    Ok(true)
}

/// Upgrade the installer inside the venv.
pub fn upgrade_pip(runner: &dyn CommandRunner, app: &App, workdir: &str) -> Result<()> {
    let cmd = format!(
        "cd {} && {} install --upgrade pip",
        shell::quote_path(workdir),
        venv_bin(app, "pip"),
    );
    let output = runner.run(&cmd);
    if !output.success {
        return Err(Error::build_env_failed(format!(
            "pip upgrade failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Whether the manifest file exists in the working copy.
pub fn manifest_exists(runner: &dyn CommandRunner, app: &App, workdir: &str) -> bool {
    runner.check(&format!(
        "cd {} && [ -f {} ]",
        shell::quote_path(workdir),
        shell::quote_arg(&app.manifest),
    ))
}

/// Install declared dependencies from the manifest.
pub fn install_manifest(runner: &dyn CommandRunner, app: &App, workdir: &str) -> Result<()> {
    log_status!("build", "Installing dependencies from {}", app.manifest);
    let cmd = format!(
        "cd {} && {} install -r {}",
        shell::quote_path(workdir),
        venv_bin(app, "pip"),
        shell::quote_arg(&app.manifest),
    );
    let output = runner.run(&cmd);
    if !output.success {
        return Err(Error::build_env_failed(format!(
            "dependency install failed: {}",
            output.stderr.trim()
        )));
    }
    Ok(())
}

/// Full provisioning pass: interpreter, venv, pip upgrade, manifest install.
pub fn provision(
    runner: &dyn CommandRunner,
    app: &App,
    workdir: &str,
    policy: ManifestPolicy,
) -> Result<EnvReport> {
    ensure_python(runner, app)?;
    let venv_created = ensure_venv(runner, app, workdir)?;
    upgrade_pip(runner, app, workdir)?;

    let manifest_present = manifest_exists(runner, app, workdir);
    if !manifest_present {
        match policy {
            ManifestPolicy::Required => {
                return Err(Error::deploy_manifest_missing(app.manifest.clone()))
            }
            ManifestPolicy::WarnIfMissing => {
                log_status!(
                    "build",
                    "Warning: {} not found, skipping dependency install",
                    app.manifest
                );
                return Ok(EnvReport {
                    venv_created,
                    manifest_present: false,
                    installed: false,
                });
            }
        }
    }

    install_manifest(runner, app, workdir)?;

    Ok(EnvReport {
        venv_created,
        manifest_present: true,
        installed: true,
    })
}
