//! Devtools configuration
//!
//! Loaded from a TOML file when present, then overridden by `FRAMEDEV_*`
//! environment variables.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use framedev_common::{RouteEntry, DEFAULT_BASE_PATH};

use crate::resolver::AppCredentials;

/// Devtools configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DevtoolsConfig {
    /// Listen address of the standalone server
    pub listen: String,

    /// Mount point of the devtools, e.g. `/dev`
    pub base_path: String,

    /// Origin of the inspected application. Defaults to the request origin.
    pub app_origin: Option<String>,

    /// Custom app fid to act as
    pub app_fid: Option<u64>,

    /// Custom app mnemonic to act as
    #[serde(skip_serializing)]
    pub app_mnemonic: Option<String>,

    /// Public path prefix the UI bundle is served under
    pub assets_path: Option<String>,

    /// On-disk directory with the UI bundle (`main.js`, `assets/main.css`)
    pub assets_dir: Option<PathBuf>,

    /// Timeout for each upstream request
    pub request_timeout_secs: u64,

    /// Route table of the inspected application
    pub routes: Vec<RouteEntry>,
}

impl Default for DevtoolsConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:5173".to_string(),
            base_path: DEFAULT_BASE_PATH.to_string(),
            app_origin: None,
            app_fid: None,
            app_mnemonic: None,
            assets_path: None,
            assets_dir: None,
            request_timeout_secs: 10,
            routes: vec![RouteEntry::frame("/")],
        }
    }
}

impl DevtoolsConfig {
    /// Load configuration from file, falling back to defaults if it is missing
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply `FRAMEDEV_*` overrides from the process environment
    pub fn with_env(self) -> anyhow::Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in practice)
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("FRAMEDEV_LISTEN") {
            self.listen = v;
        }
        if let Some(v) = var("FRAMEDEV_BASE_PATH") {
            self.base_path = v;
        }
        if let Some(v) = var("FRAMEDEV_APP_ORIGIN") {
            self.app_origin = Some(v);
        }
        if let Some(v) = var("FRAMEDEV_APP_FID") {
            let fid = v
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("FRAMEDEV_APP_FID must be an integer, got {:?}", v))?;
            self.app_fid = Some(fid);
        }
        if let Some(v) = var("FRAMEDEV_APP_MNEMONIC") {
            self.app_mnemonic = Some(v);
        }
        if let Some(v) = var("FRAMEDEV_ASSETS_PATH") {
            self.assets_path = Some(v);
        }
        if let Some(v) = var("FRAMEDEV_ASSETS_DIR") {
            self.assets_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = var("FRAMEDEV_ROUTES") {
            self.routes = v
                .split(',')
                .map(|p| p.trim())
                .filter(|p| !p.is_empty())
                .map(RouteEntry::frame)
                .collect();
        }
        Ok(self)
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address {:?}: {}", self.listen, e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn credentials(&self) -> AppCredentials {
        AppCredentials {
            fid: self.app_fid,
            mnemonic: self.app_mnemonic.clone(),
        }
    }
}
