use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{self, ConfigEntity};
use crate::error::{Error, Result};
use crate::local_files::{self, FileSystem};
use crate::paths;

/// Environment variable overriding the remote application directory.
pub const ENV_APP_DIR: &str = "PULLMAN_APP_DIR";

/// Repo-local manifest file overriding per-app pipeline knobs.
pub const REPO_MANIFEST_FILE: &str = "pullman.yml";

/// How a failing test suite affects the rest of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestFailureMode {
    /// Non-zero exit is recorded but the pipeline continues to deploy.
    #[default]
    Suppress,
    /// Non-zero exit aborts the pipeline before deploy.
    Fatal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    #[serde(skip_deserializing, default)]
    pub id: String,

    /// Clone URL of the application repository.
    pub repo_url: String,

    /// Branch deployed by default.
    #[serde(default = "default_branch")]
    pub branch: String,

    /// Target directory on the remote host.
    pub remote_path: String,

    /// Base directory for local working copies. Defaults to the
    /// workspaces directory under the pullman config dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_root: Option<String>,

    /// Dependency manifest file, relative to the working copy root.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Virtual environment directory, relative to the working copy root.
    #[serde(default = "default_venv_dir")]
    pub venv_dir: String,

    /// Python interpreter used to create the environment.
    #[serde(default = "default_python")]
    pub python: String,

    /// Configured server entity; when absent, credentials come from
    /// the PULLMAN_DEPLOY_* environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,

    /// Systemd unit restarted after deploy. Takes precedence over
    /// `start_command` when both are set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_unit: Option<String>,

    /// Command started detached (nohup) after deploy when no service
    /// unit is configured. Runs in the remote working copy with the
    /// venv bin directory on PATH.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_command: Option<String>,

    /// Log file the detached process writes to, relative to the remote
    /// working copy root.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Branch gate: when non-empty, `run` only proceeds for these
    /// branches. Empty means no gate.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,

    /// Whether a locally-missing branch is created tracking the remote
    /// during clone-or-pull.
    #[serde(default)]
    pub create_missing_branch: bool,

    #[serde(default)]
    pub test_failure: TestFailureMode,

    /// Test runner override. Defaults to pytest inside the venv.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_command: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_manifest() -> String {
    "requirements.txt".to_string()
}

fn default_venv_dir() -> String {
    "venv".to_string()
}

fn default_python() -> String {
    "python3".to_string()
}

fn default_log_file() -> String {
    "app.log".to_string()
}

impl App {
    /// Remote application directory, honoring the PULLMAN_APP_DIR override.
    pub fn effective_remote_path(&self) -> String {
        std::env::var(ENV_APP_DIR)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.remote_path.clone())
    }

    /// Local working copy directory: `<local_root>/<app id>`.
    pub fn workdir(&self) -> Result<PathBuf> {
        let root = match &self.local_root {
            Some(root) => PathBuf::from(shellexpand::tilde(root).to_string()),
            None => paths::workspaces()?,
        };
        Ok(root.join(&self.id))
    }

    /// Whether the branch gate admits the given branch.
    pub fn branch_allowed(&self, branch: &str) -> bool {
        self.branches.is_empty() || self.branches.iter().any(|b| b == branch)
    }
}

fn is_valid_unit_name(unit: &str) -> bool {
    Regex::new(r"^[A-Za-z0-9@:._\-]+\.service$")
        .map(|re| re.is_match(unit))
        .unwrap_or(false)
}

impl ConfigEntity for App {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn config_path(id: &str) -> Result<PathBuf> {
        paths::app(id)
    }
    fn config_dir() -> Result<PathBuf> {
        paths::apps()
    }
    fn not_found_error(id: String, suggestions: Vec<String>) -> Error {
        Error::app_not_found(id, suggestions)
    }
    fn entity_type() -> &'static str {
        "app"
    }

    fn validate(&self) -> Result<()> {
        if self.repo_url.is_empty() {
            return Err(Error::config_invalid_value(
                "repoUrl",
                None,
                "Repository URL must not be empty",
            ));
        }
        if self.remote_path.is_empty() {
            return Err(Error::config_invalid_value(
                "remotePath",
                None,
                "Remote path must not be empty",
            ));
        }
        if let Some(ref unit) = self.service_unit {
            if !is_valid_unit_name(unit) {
                return Err(Error::config_invalid_value(
                    "serviceUnit",
                    Some(unit.clone()),
                    "Service unit must be a valid systemd unit name ending in .service",
                ));
            }
        }
        if let Some(ref sid) = self.server_id {
            if !crate::server::exists(sid) {
                let suggestions = config::find_similar_ids::<crate::server::Server>(sid);
                return Err(Error::server_not_found(sid.clone(), suggestions));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Core CRUD - Thin wrappers around config module
// ============================================================================

pub fn load(id: &str) -> Result<App> {
    config::load::<App>(id)
}

pub fn list() -> Result<Vec<App>> {
    config::list::<App>()
}

pub fn list_ids() -> Result<Vec<String>> {
    config::list_ids::<App>()
}

pub fn save(app: &App) -> Result<()> {
    config::save(app)
}

pub fn create(app: App) -> Result<App> {
    config::create(app)
}

pub fn delete(id: &str) -> Result<()> {
    config::delete::<App>(id)
}

// ============================================================================
// Repo-local overrides (pullman.yml)
// ============================================================================

/// Subset of app fields a repository may override from a checked-out
/// `pullman.yml`. The file travels with the source, the way workflow
/// definitions do, so knobs like the test failure mode live next to the
/// code they gate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RepoOverrides {
    pub manifest: Option<String>,
    pub venv_dir: Option<String>,
    pub python: Option<String>,
    pub service_unit: Option<String>,
    pub start_command: Option<String>,
    pub log_file: Option<String>,
    pub test_failure: Option<TestFailureMode>,
    pub test_command: Option<String>,
    pub create_missing_branch: Option<bool>,
}

/// Load `pullman.yml` from a working copy, if present.
pub fn load_repo_overrides(workdir: &Path) -> Result<Option<RepoOverrides>> {
    let path = workdir.join(REPO_MANIFEST_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let content = local_files::local().read(&path)?;
    let overrides: RepoOverrides = serde_yml::from_str(&content).map_err(|e| {
        Error::internal_yaml(e.to_string(), Some(path.to_string_lossy().to_string()))
    })?;
    Ok(Some(overrides))
}

/// Apply repo-local overrides on top of the configured app.
pub fn apply_repo_overrides(app: &mut App, overrides: &RepoOverrides) {
    if let Some(ref v) = overrides.manifest {
        app.manifest = v.clone();
    }
    if let Some(ref v) = overrides.venv_dir {
        app.venv_dir = v.clone();
    }
    if let Some(ref v) = overrides.python {
        app.python = v.clone();
    }
    if let Some(ref v) = overrides.service_unit {
        app.service_unit = Some(v.clone());
    }
    if let Some(ref v) = overrides.start_command {
        app.start_command = Some(v.clone());
    }
    if let Some(ref v) = overrides.log_file {
        app.log_file = v.clone();
    }
    if let Some(v) = overrides.test_failure {
        app.test_failure = v;
    }
    if let Some(ref v) = overrides.test_command {
        app.test_command = Some(v.clone());
    }
    if let Some(v) = overrides.create_missing_branch {
        app.create_missing_branch = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_app() -> App {
        App {
            id: "flaskapp".to_string(),
            repo_url: "git@github.com:acme/flaskapp.git".to_string(),
            branch: "main".to_string(),
            remote_path: "/home/deploy/flaskapp".to_string(),
            local_root: None,
            manifest: default_manifest(),
            venv_dir: default_venv_dir(),
            python: default_python(),
            server_id: None,
            service_unit: None,
            start_command: Some("python app.py".to_string()),
            log_file: default_log_file(),
            branches: vec![],
            create_missing_branch: false,
            test_failure: TestFailureMode::default(),
            test_command: None,
        }
    }

    #[test]
    fn branch_gate_empty_admits_everything() {
        let app = sample_app();
        assert!(app.branch_allowed("main"));
        assert!(app.branch_allowed("feature/x"));
    }

    #[test]
    fn branch_gate_restricts_to_listed_branches() {
        let mut app = sample_app();
        app.branches = vec!["staging".to_string(), "main".to_string()];
        assert!(app.branch_allowed("main"));
        assert!(app.branch_allowed("staging"));
        assert!(!app.branch_allowed("feature/x"));
    }

    #[test]
    fn unit_name_validation() {
        assert!(is_valid_unit_name("flaskapp.service"));
        assert!(is_valid_unit_name("my-app@2.service"));
        assert!(!is_valid_unit_name("flaskapp"));
        assert!(!is_valid_unit_name("bad unit.service"));
    }

    #[test]
    fn test_failure_defaults_to_suppress() {
        let json = r#"{
            "repoUrl": "git@github.com:acme/flaskapp.git",
            "remotePath": "/home/deploy/flaskapp"
        }"#;
        let app: App = serde_json::from_str(json).unwrap();
        assert_eq!(app.test_failure, TestFailureMode::Suppress);
        assert_eq!(app.manifest, "requirements.txt");
        assert_eq!(app.venv_dir, "venv");
    }

    #[test]
    fn repo_overrides_apply_on_top() {
        let mut app = sample_app();
        let overrides: RepoOverrides = serde_yml::from_str(
            "testFailure: fatal\nserviceUnit: flaskapp.service\nmanifest: requirements-prod.txt\n",
        )
        .unwrap();
        apply_repo_overrides(&mut app, &overrides);
        assert_eq!(app.test_failure, TestFailureMode::Fatal);
        assert_eq!(app.service_unit.as_deref(), Some("flaskapp.service"));
        assert_eq!(app.manifest, "requirements-prod.txt");
    }
}
