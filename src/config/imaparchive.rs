use std::{
    fs::{self, read_to_string},
    io::ErrorKind,
    os::unix::fs::PermissionsExt as _,
    path::{Path, PathBuf},
};

use derive_getters::Getters;
use log::debug;
use serde::Deserialize;

use crate::config::{AuthConfig, ConfigError, default_location};

pub const DEFAULT_HOST: &str = "imap.gmail.com";
pub const DEFAULT_PORT: u16 = 993;

#[derive(Deserialize, Getters, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    authentication: AuthConfig,
    #[serde(default)]
    archival: ArchivalConfig,
    #[serde(default)]
    server: ServerConfig,
}

#[derive(Deserialize, Getters, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArchivalConfig {
    #[getter(skip)]
    archivedir: Option<PathBuf>,
    #[serde(default)]
    includes: Vec<String>,
    #[serde(default)]
    excludes: Vec<String>,
}

impl ArchivalConfig {
    pub fn archivedir(&self) -> Option<&Path> {
        self.archivedir.as_deref()
    }
}

#[derive(Deserialize, Getters, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Command line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub username: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub archivedir: Option<PathBuf>,
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
}

impl Config {
    /// Reads `file`, or the default location if none is given. Only an explicitly given
    /// file has to exist.
    pub fn load_from_file(file: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(file) = file else {
            let file = default_location()?;
            return match Self::load(&file) {
                Err(ConfigError::Unreadable { source, .. })
                    if source.kind() == ErrorKind::NotFound =>
                {
                    debug!("no config file at {}, using defaults", file.display());
                    Ok(Self::default())
                }
                config => config,
            };
        };

        Self::load(file)
    }

    fn load(file: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(file).map_err(|source| ConfigError::Unreadable {
            path: file.to_path_buf(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(ConfigError::NotAFile(file.to_path_buf()));
        }
        let mode = metadata.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            return Err(ConfigError::Unprotected {
                path: file.to_path_buf(),
                mode,
            });
        }

        let contents = read_to_string(file).map_err(|source| ConfigError::Unreadable {
            path: file.to_path_buf(),
            source,
        })?;
        debug!("loaded config from {}", file.display());
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: file.to_path_buf(),
            source,
        })
    }

    pub fn apply(&mut self, overrides: Overrides) {
        self.authentication.override_username(overrides.username);
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if overrides.archivedir.is_some() {
            self.archival.archivedir = overrides.archivedir;
        }
        if !overrides.includes.is_empty() {
            self.archival.includes = overrides.includes;
        }
        if !overrides.excludes.is_empty() {
            self.archival.excludes = overrides.excludes;
        }
    }
}
