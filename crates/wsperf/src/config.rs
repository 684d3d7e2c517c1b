use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    DEFAULT_NUMBER_OF_CLIENTS, DEFAULT_NUMBER_OF_MESSAGES, DEFAULT_RESULTS_DIR,
    DEFAULT_SERVER_HOST, DEFAULT_SERVER_PATH, DEFAULT_SERVER_PORT, DEFAULT_TIMEOUT_SECS,
};
use crate::errors::ConfigError;
use crate::parsers::parse_duration;

/// Settings of one benchmark run. Immutable once the run has started.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub number_of_clients: usize,
    pub number_of_messages: usize,
    pub server_host: String,
    pub server_port: u16,
    pub server_path: String,
    pub timeout_secs: u64,
    pub message_interval: Option<Duration>,
    pub results_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            number_of_clients: DEFAULT_NUMBER_OF_CLIENTS,
            number_of_messages: DEFAULT_NUMBER_OF_MESSAGES,
            server_host: DEFAULT_SERVER_HOST.to_owned(),
            server_port: DEFAULT_SERVER_PORT,
            server_path: DEFAULT_SERVER_PATH.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            message_interval: None,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
        }
    }
}

impl RunConfig {
    /// Defaults, then the config file, then the command line.
    pub fn resolve(
        file: Option<FileConfig>,
        cli: ConfigOverrides,
    ) -> Result<Self, ConfigError> {
        let mut config = RunConfig::default();
        if let Some(file) = file {
            config.apply(file.into())?;
        }
        config.apply(cli)?;
        config.validate()
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) -> Result<(), ConfigError> {
        if let Some(clients) = overrides.number_of_clients {
            self.number_of_clients = clients;
        }
        if let Some(messages) = overrides.number_of_messages {
            self.number_of_messages = messages;
        }
        if let Some(host) = overrides.server_host {
            self.server_host = host;
        }
        if let Some(port) = overrides.server_port {
            self.server_port = port;
        }
        if let Some(path) = overrides.server_path {
            self.server_path = path;
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if let Some(interval) = overrides.message_interval {
            self.message_interval = Some(parse_duration(&interval)?);
        }
        if let Some(dir) = overrides.results_dir {
            self.results_dir = dir;
        }
        Ok(())
    }

    pub fn validate(mut self) -> Result<Self, ConfigError> {
        if self.number_of_clients == 0 {
            return Err(ConfigError::Invalid("number.of.clients must be positive"));
        }
        if self.number_of_messages == 0 {
            return Err(ConfigError::Invalid("number.of.messages must be positive"));
        }
        if self
            .number_of_clients
            .checked_mul(self.number_of_messages)
            .is_none()
        {
            return Err(ConfigError::Invalid(
                "number.of.clients * number.of.messages is too large",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout must be positive"));
        }
        if self.server_host.is_empty() {
            return Err(ConfigError::Invalid("server.host must not be empty"));
        }
        if !self.server_path.starts_with('/') {
            self.server_path.insert(0, '/');
        }
        // A zero interval is the same as no pacing at all
        if self.message_interval == Some(Duration::ZERO) {
            self.message_interval = None;
        }
        Ok(self)
    }

    pub fn server_url(&self) -> String {
        format!(
            "ws://{}:{}{}",
            self.server_host, self.server_port, self.server_path
        )
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Messages expected in both directions over the whole run.
    pub fn total_messages(&self) -> usize {
        self.number_of_clients * self.number_of_messages
    }
}

/// Optional values layered on top of [`RunConfig::default`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConfigOverrides {
    pub number_of_clients: Option<usize>,
    pub number_of_messages: Option<usize>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub server_path: Option<String>,
    pub timeout_secs: Option<u64>,
    pub message_interval: Option<String>,
    pub results_dir: Option<PathBuf>,
}

// The TOML file uses the property names as dotted keys, so
// `number.of.clients = 10` and a `[number.of]` table are both accepted.
#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub number: NumberConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub timeout: Option<u64>,
    #[serde(rename = "message-interval")]
    pub message_interval: Option<String>,
    #[serde(default)]
    pub results: ResultsConfig,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct NumberConfig {
    #[serde(default)]
    pub of: CountsConfig,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CountsConfig {
    pub clients: Option<usize>,
    pub messages: Option<usize>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResultsConfig {
    pub dir: Option<PathBuf>,
}

impl FileConfig {
    /// Loads and parses the TOML configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

impl From<FileConfig> for ConfigOverrides {
    fn from(file: FileConfig) -> Self {
        ConfigOverrides {
            number_of_clients: file.number.of.clients,
            number_of_messages: file.number.of.messages,
            server_host: file.server.host,
            server_port: file.server.port,
            server_path: file.server.path,
            timeout_secs: file.timeout,
            message_interval: file.message_interval,
            results_dir: file.results.dir,
        }
    }
}
