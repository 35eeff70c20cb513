use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use logai_engine::{ClientSettings, StaticTokenProvider, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};

use super::cli::Cli;
use super::logging::LogDestination;

const CONFIG_FILENAME: &str = "logai.ron";
pub const ENV_SERVER_URL: &str = "LOGAI_SERVER_URL";
pub const ENV_TOKEN: &str = "LOGAI_TOKEN";

/// Settings from `logai.ron`, then environment, then command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server_url: String,
    pub access_token: Option<String>,
    /// When false, requests go out without an `Authorization` header.
    pub require_auth: bool,
    pub report_dir: PathBuf,
    pub log: LogDestination,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            require_auth: true,
            report_dir: PathBuf::from("./reports"),
            log: LogDestination::default(),
        }
    }
}

/// Where the loaded config came from, for the startup log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl AppConfig {
    /// Loads `explicit`, or `./logai.ron` when it exists. An explicit path
    /// that cannot be read is an error; a missing default file is not.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, ConfigSource)> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(CONFIG_FILENAME),
        };
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
                return Ok((Self::default(), ConfigSource::Defaults));
            }
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read config {path:?}"));
            }
        };
        let config = Self::parse(&text).with_context(|| format!("failed to parse config {path:?}"))?;
        Ok((config, ConfigSource::File(path)))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(ron::from_str(text)?)
    }

    /// Applies `LOGAI_SERVER_URL` and `LOGAI_TOKEN`; blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|value| !value.trim().is_empty()) {
            self.server_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN).filter(|value| !value.trim().is_empty()) {
            self.access_token = Some(token);
        }
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(server) = &cli.server {
            self.server_url = server.clone();
        }
        if let Some(token) = &cli.token {
            self.access_token = Some(token.clone());
        }
        if let Some(log) = cli.log {
            self.log = log;
        }
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings::with_base_url(self.server_url.clone())
    }

    pub fn token_provider(&self) -> StaticTokenProvider {
        StaticTokenProvider::new(self.access_token.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::{AppConfig, ConfigSource, ENV_SERVER_URL, ENV_TOKEN};
    use crate::platform::cli::Cli;
    use crate::platform::logging::LogDestination;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::parse(r#"(server_url: "https://logai.example.com", log: both)"#)
            .unwrap();
        assert_eq!(config.server_url, "https://logai.example.com");
        assert_eq!(config.log, LogDestination::Both);
        assert!(config.require_auth);
        assert_eq!(config.report_dir, PathBuf::from("./reports"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.ron");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logai.ron");
        std::fs::write(&path, "(require_auth: false, report_dir: \"out\")").unwrap();

        let (config, source) = AppConfig::load(Some(&path)).unwrap();
        assert!(!config.require_auth);
        assert_eq!(config.report_dir, PathBuf::from("out"));
        assert_eq!(source, ConfigSource::File(path));
    }

    #[test]
    fn env_then_cli_override_file() {
        let mut config = AppConfig::default();
        let env = HashMap::from([
            (ENV_SERVER_URL, "http://env:8000".to_string()),
            (ENV_TOKEN, "  ".to_string()),
        ]);
        config.apply_env(|key| env.get(key).cloned());
        assert_eq!(config.server_url, "http://env:8000");
        assert_eq!(config.access_token, None);

        let cli = Cli::try_parse_from(["logai", "--token", "cli-token", "health"]).unwrap();
        config.apply_cli(&cli);
        assert_eq!(config.server_url, "http://env:8000");
        assert_eq!(config.access_token.as_deref(), Some("cli-token"));
    }
}
