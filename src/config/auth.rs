use std::process::Command;

use log::debug;
use serde::Deserialize;

use crate::config::ConfigError;

#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    username: Option<String>,
    password_cmd: Option<String>,
    password: Option<String>,
}

impl AuthConfig {
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn override_username(&mut self, username: Option<String>) {
        if username.is_some() {
            self.username = username;
        }
    }

    /// Password from `password_cmd` if configured, else the literal `password`.
    pub fn password(&self) -> Result<String, ConfigError> {
        if let Some(password_cmd) = &self.password_cmd {
            return run_password_cmd(password_cmd);
        }
        self.password.clone().ok_or(ConfigError::MissingPassword)
    }
}

fn run_password_cmd(password_cmd: &str) -> Result<String, ConfigError> {
    let mut cmd_parts = password_cmd.split_whitespace();
    let program = cmd_parts.next().ok_or(ConfigError::EmptyPasswordCommand)?;
    debug!("running {program} for password");
    let output = Command::new(program)
        .args(cmd_parts)
        .output()
        .map_err(|source| ConfigError::PasswordCommand {
            program: program.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ConfigError::PasswordCommandFailed {
            program: program.to_string(),
            status: output.status,
        });
    }
    let password = String::from_utf8_lossy(&output.stdout)
        .trim_end_matches(['\r', '\n'])
        .to_string();
    if password.is_empty() {
        return Err(ConfigError::NoPassword {
            program: program.to_string(),
        });
    }

    Ok(password)
}

#[cfg(test)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;

    fn auth(password_cmd: Option<&str>, password: Option<&str>) -> AuthConfig {
        AuthConfig {
            username: Some("someone@example.com".to_string()),
            password_cmd: password_cmd.map(ToString::to_string),
            password: password.map(ToString::to_string),
        }
    }

    #[rstest]
    fn test_password_cmd_output_is_trimmed() {
        let password = assert_ok!(auth(Some("echo  s3cret"), Some("ignored")).password());
        assert_eq!("s3cret", password);
    }

    #[rstest]
    fn test_literal_password_is_used_without_cmd() {
        assert_eq!("plain", assert_ok!(auth(None, Some("plain")).password()));
    }

    #[rstest]
    #[case(auth(None, None))]
    #[case(auth(Some("   "), None))]
    #[case(auth(Some("false"), None))]
    #[case(auth(Some("true"), None))]
    #[case(auth(Some("/nonexistent/password-helper"), None))]
    fn test_missing_password_is_an_error(#[case] auth: AuthConfig) {
        assert_err!(auth.password());
    }

    #[rstest]
    fn test_cli_username_overrides_file() {
        let mut auth = auth(None, None);
        auth.override_username(None);
        assert_eq!(Some("someone@example.com"), auth.username());
        auth.override_username(Some("other".to_string()));
        assert_eq!(Some("other"), auth.username());
    }
}
