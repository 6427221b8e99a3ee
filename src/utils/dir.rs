use std::{env, io, path::PathBuf};

use anyhow::{anyhow, Result};

pub const APPLICATION_NAME: &str = "webtally";

/// Resolves the directory holding records, settings and logs, creating it when missing.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = state_root()?;
    path.push(APPLICATION_NAME);

    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v.into()),
    }
}

#[cfg(windows)]
fn state_root() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .map_err(|_| anyhow!("APPDATA should be present on Windows"))
}

#[cfg(target_os = "macos")]
fn state_root() -> Result<PathBuf> {
    env::var("HOME")
        .map(|home| {
            let mut path = PathBuf::from(home);
            path.push("Library/Application Support");
            path
        })
        .map_err(|_| anyhow!("Couldn't find HOME"))
}

#[cfg(not(any(windows, target_os = "macos")))]
fn state_root() -> Result<PathBuf> {
    env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/state");
                path
            })
        })
        .map_err(|_| anyhow!("Couldn't find neither XDG_STATE_HOME nor HOME"))
}
