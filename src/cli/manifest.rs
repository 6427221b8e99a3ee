use std::{fmt::Display, path::PathBuf};

use anyhow::{bail, Result};
use clap::ValueEnum;
use serde::Serialize;

/// Name the extension connects to.
pub const HOST_NAME: &str = "webtally";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Browser {
    Chromium,
    Firefox,
}

impl Display for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Browser::Chromium => write!(f, "chromium"),
            Browser::Firefox => write!(f, "firefox"),
        }
    }
}

/// Native messaging host manifest. Chromium based browsers list allowed origins, Firefox lists
/// extension ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostManifest {
    pub name: &'static str,
    pub description: &'static str,
    pub path: PathBuf,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_origins: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
}

pub fn host_manifest(browser: Browser, host_path: PathBuf, origins: Vec<String>) -> Result<HostManifest> {
    if origins.is_empty() {
        bail!("At least one extension has to be allowed to talk to the host");
    }

    let (allowed_origins, allowed_extensions) = match browser {
        Browser::Chromium => {
            let origins = origins
                .into_iter()
                .map(|origin| {
                    let Some(id) = origin.strip_prefix("chrome-extension://") else {
                        bail!("{origin} is not a chrome-extension:// origin");
                    };
                    let id = id.trim_end_matches('/');
                    if id.is_empty() || id.contains('/') {
                        bail!("{origin} doesn't name a single extension");
                    }
                    Ok(format!("chrome-extension://{id}/"))
                })
                .collect::<Result<Vec<_>>>()?;
            (Some(origins), None)
        }
        Browser::Firefox => (None, Some(origins)),
    };

    Ok(HostManifest {
        name: HOST_NAME,
        description: "Records time spent per website",
        path: host_path,
        kind: "stdio",
        allowed_origins,
        allowed_extensions,
    })
}
