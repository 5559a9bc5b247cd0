use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::config::{self, ConfigEntity};
use crate::error::{Error, Result};
use crate::paths;

/// Environment variables used when no server entity is referenced.
/// This is the injected-credential path: host, user and key arrive from the
/// surrounding automation instead of a config file.
pub mod env_keys {
    pub const HOST: &str = "PULLMAN_DEPLOY_HOST";
    pub const USER: &str = "PULLMAN_DEPLOY_USER";
    pub const KEY: &str = "PULLMAN_SSH_KEY";
    pub const PORT: &str = "PULLMAN_DEPLOY_PORT";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    #[serde(skip_deserializing, default)]
    pub id: String,
    pub host: String,
    pub user: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl Server {
    pub fn is_valid(&self) -> bool {
        !self.host.is_empty() && !self.user.is_empty()
    }

    /// Build a server from the PULLMAN_DEPLOY_* environment variables.
    /// Returns None when the host variable is absent.
    pub fn from_env() -> Option<Server> {
        let host = std::env::var(env_keys::HOST).ok().filter(|h| !h.is_empty())?;
        let user = std::env::var(env_keys::USER).unwrap_or_default();
        let port = std::env::var(env_keys::PORT)
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or_else(default_port);
        let identity_file = std::env::var(env_keys::KEY).ok().filter(|k| !k.is_empty());

        Some(Server {
            id: "env".to_string(),
            host,
            user,
            port,
            identity_file,
        })
    }
}

impl ConfigEntity for Server {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn config_path(id: &str) -> Result<PathBuf> {
        paths::server(id)
    }
    fn config_dir() -> Result<PathBuf> {
        paths::servers()
    }
    fn not_found_error(id: String, suggestions: Vec<String>) -> Error {
        Error::server_not_found(id, suggestions)
    }
    fn entity_type() -> &'static str {
        "server"
    }

    fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            let mut missing = Vec::new();
            if self.host.is_empty() {
                missing.push("host".to_string());
            }
            if self.user.is_empty() {
                missing.push("user".to_string());
            }
            return Err(Error::ssh_server_invalid(self.id.clone(), missing));
        }
        Ok(())
    }
}

// ============================================================================
// Core CRUD - Thin wrappers around config module
// ============================================================================

pub fn load(id: &str) -> Result<Server> {
    config::load::<Server>(id)
}

pub fn list() -> Result<Vec<Server>> {
    config::list::<Server>()
}

pub fn save(server: &Server) -> Result<()> {
    config::save(server)
}

pub fn create(server: Server) -> Result<Server> {
    config::create(server)
}

pub fn delete(id: &str) -> Result<()> {
    config::delete::<Server>(id)
}

pub fn exists(id: &str) -> bool {
    config::exists::<Server>(id)
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve deploy credentials: a configured server entity when an ID is
/// given, otherwise the environment-variable source.
pub fn resolve(server_id: Option<&str>) -> Result<Server> {
    match server_id {
        Some(id) => load(id),
        None => {
            let server = Server::from_env().ok_or_else(|| {
                Error::validation_missing_argument(vec![
                    "serverId".to_string(),
                    env_keys::HOST.to_string(),
                ])
                .with_hint("Reference a configured server with 'serverId', or export PULLMAN_DEPLOY_HOST/USER and PULLMAN_SSH_KEY")
            })?;
            if !server.is_valid() {
                return Err(Error::ssh_server_invalid(
                    server.id.clone(),
                    vec![env_keys::USER.to_string()],
                ));
            }
            Ok(server)
        }
    }
}

// ============================================================================
// SSH Key Management
// ============================================================================

/// Point a server at an existing identity file (tilde-expanded, must exist).
pub fn use_key(server_id: &str, key_path: &str) -> Result<Server> {
    let expanded = shellexpand::tilde(key_path).to_string();

    if !std::path::Path::new(&expanded).exists() {
        return Err(Error::ssh_identity_file_not_found(
            server_id.to_string(),
            expanded,
        ));
    }

    let mut server = load(server_id)?;
    server.identity_file = Some(expanded);
    save(&server)?;
    Ok(server)
}

pub fn unset_key(server_id: &str) -> Result<Server> {
    let mut server = load(server_id)?;
    server.identity_file = None;
    save(&server)?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_validity() {
        let server = Server {
            id: "web".to_string(),
            host: "203.0.113.7".to_string(),
            user: "deploy".to_string(),
            port: 22,
            identity_file: None,
        };
        assert!(server.is_valid());

        let server = Server {
            host: String::new(),
            ..server
        };
        assert!(!server.is_valid());
    }

    #[test]
    fn default_port_is_22() {
        let server: Server =
            serde_json::from_str(r#"{"host": "example.com", "user": "deploy"}"#).unwrap();
        assert_eq!(server.port, 22);
    }
}
