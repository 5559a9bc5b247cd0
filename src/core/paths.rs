use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base pullman config directory (universal ~/.config/pullman/ on all platforms)
pub fn pullman() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows".to_string())
        })?;
        Ok(PathBuf::from(appdata).join("pullman"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("pullman"))
    }
}

/// Apps directory
pub fn apps() -> Result<PathBuf> {
    Ok(pullman()?.join("apps"))
}

/// Servers directory
pub fn servers() -> Result<PathBuf> {
    Ok(pullman()?.join("servers"))
}

/// Default root for local working copies, keyed by app ID
pub fn workspaces() -> Result<PathBuf> {
    Ok(pullman()?.join("workspaces"))
}

/// App config file path
pub fn app(id: &str) -> Result<PathBuf> {
    Ok(apps()?.join(format!("{}.json", id)))
}

/// Server config file path
pub fn server(id: &str) -> Result<PathBuf> {
    Ok(servers()?.join(format!("{}.json", id)))
}
