mod auth;
mod imaparchive;

use std::{env, io, path::PathBuf, process::ExitStatus};

use thiserror::Error;

pub use auth::AuthConfig;
pub use imaparchive::Config;
pub use imaparchive::Overrides;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("neither XDG_CONFIG_HOME nor HOME is set")]
    NoConfigHome,
    #[error("config file {} is not readable", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("config file {} is not a regular file", .0.display())]
    NotAFile(PathBuf),
    #[error("config file {} may hold a password but has mode {mode:o}, allow access for its owner only", path.display())]
    Unprotected { path: PathBuf, mode: u32 },
    #[error("config file {} is invalid", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("no username given")]
    MissingUsername,
    #[error("no password or password_cmd given")]
    MissingPassword,
    #[error("password_cmd is empty")]
    EmptyPasswordCommand,
    #[error("cannot run password_cmd {program}")]
    PasswordCommand {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("password_cmd {program} failed with {status}")]
    PasswordCommandFailed { program: String, status: ExitStatus },
    #[error("password_cmd {program} did not print a password")]
    NoPassword { program: String },
}

/// `$XDG_CONFIG_HOME/imaparchive/config.toml`, falling back to `~/.config`.
pub fn default_location() -> Result<PathBuf, ConfigError> {
    let mut config_file = match env::var_os("XDG_CONFIG_HOME").filter(|home| !home.is_empty()) {
        Some(config_home) => PathBuf::from(config_home),
        None => {
            let home = env::var_os("HOME").ok_or(ConfigError::NoConfigHome)?;
            let mut config_home = PathBuf::from(home);
            config_home.push(".config");
            config_home
        }
    };
    config_file.push(env!("CARGO_PKG_NAME"));
    config_file.push("config.toml");

    Ok(config_file)
}
