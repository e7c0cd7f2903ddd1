//! Layered configuration for dytt.
//!
//! Layers, later ones overriding earlier ones:
//! 1. Built-in defaults ([`Config::default`]).
//! 2. `config.toml` in the platform configuration directory, if present.
//! 3. An explicit file (TOML, YAML or JSON, by extension), if given.
//! 4. `DYTT_`-prefixed environment variables, with `__` separating
//!    sections from keys (`DYTT_REMOTE__TIMEOUT_SECS=10`).

pub mod error;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result};

const ENV_PREFIX: &str = "DYTT_";
const CONFIG_FILE: &str = "config.toml";
const CACHE_FILE: &str = "cache.sqlite";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub cache: CacheConfig,
    pub sync: SyncConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Site that relative listing and detail paths are resolved against.
    pub base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.dytt8.net".to_string(),
            timeout_secs: 30,
            user_agent: concat!("dytt/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
}
impl Default for CacheConfig {
    fn default() -> Self {
        let path = match project_dirs() {
            Some(dirs) => dirs.data_dir().join(CACHE_FILE),
            None => PathBuf::from(CACHE_FILE),
        };
        Self { path }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Staleness {
    /// Every resolution consults the remote.
    #[default]
    Always,
    /// A non-empty cache is used as-is unless a refresh is requested.
    WhenEmpty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub staleness: Staleness,
    pub detail_concurrency: usize,
}
impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            staleness: Staleness::default(),
            detail_concurrency: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default `tracing` filter directive, used when `RUST_LOG` is not set.
    pub level: String,
}
impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Platform directories of the application, if the platform has a notion
/// of a home directory.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("net", "dytt", "dytt")
}

/// Builds the layered [`Figment`] and extracts a validated [`Config`].
#[derive(Debug, Clone)]
pub struct Loader {
    user_config: Option<PathBuf>,
    file: Option<PathBuf>,
}
impl Default for Loader {
    fn default() -> Self {
        Self {
            user_config: project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE)),
            file: None,
        }
    }
}
impl Loader {
    /// Merge `path` on top of the user configuration.
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Ignore the configuration file in the platform configuration directory.
    pub fn without_user_config(mut self) -> Self {
        self.user_config = None;
        self
    }

    pub fn figment(&self) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = &self.user_config {
            // Optional: a missing user file is no different from an empty one.
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = &self.file {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.display().to_string()));
            }
            figment = match extension(path).as_deref() {
                Some("toml") => figment.merge(Toml::file(path)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                other => exn::bail!(ErrorKind::UnsupportedFormat(other.unwrap_or_default().to_string())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn load(&self) -> Result<Config> {
        let config: Config = self.figment()?.extract().or_raise(|| ErrorKind::Invalid)?;
        config.validate()?;
        tracing::debug!(file = ?self.file, user_config = ?self.user_config, "configuration loaded");
        Ok(config)
    }
}

impl Config {
    /// Load the configuration from every layer, with `file` as the explicit
    /// file layer.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let loader = Loader::default();
        match file {
            Some(path) => loader.file(path).load(),
            None => loader.load(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let scheme = self.remote.base_url.split_once("://").map(|(scheme, _)| scheme);
        if !matches!(scheme, Some("http" | "https")) {
            exn::bail!(ErrorKind::Validation {
                field: "remote.base_url",
                reason: "must be an http(s) URL",
            });
        }
        if self.remote.timeout_secs == 0 {
            exn::bail!(ErrorKind::Validation {
                field: "remote.timeout_secs",
                reason: "must be at least 1",
            });
        }
        if self.sync.detail_concurrency == 0 {
            exn::bail!(ErrorKind::Validation {
                field: "sync.detail_concurrency",
                reason: "must be at least 1",
            });
        }
        if self.cache.path.as_os_str().is_empty() {
            exn::bail!(ErrorKind::Validation {
                field: "cache.path",
                reason: "must not be empty",
            });
        }
        if self.log.level.trim().is_empty() {
            exn::bail!(ErrorKind::Validation {
                field: "log.level",
                reason: "must not be empty",
            });
        }
        Ok(())
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|ext| ext.to_str()).map(str::to_lowercase)
}
