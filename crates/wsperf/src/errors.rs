use std::path::PathBuf;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read the config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A `message-interval` value none of the duration parsers accept.
    #[error("Invalid duration: '{0}'")]
    InvalidDuration(String),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WsPerfError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Client {id} failed to connect: {source}")]
    Connect {
        id: usize,
        #[source]
        source: tungstenite::Error,
    },

    #[error("Unable to connect all clients: {opened}/{expected} open after {timeout_secs}s")]
    ConnectTimeout {
        opened: usize,
        expected: usize,
        timeout_secs: u64,
    },

    #[error("Client {id} failed to close: {reason}")]
    Close { id: usize, reason: String },

    #[error("Unable to close all clients: {closed}/{expected} closed after {timeout_secs}s")]
    CloseTimeout {
        closed: usize,
        expected: usize,
        timeout_secs: u64,
    },

    #[error("Unable to write the result file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to serialize the result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unable to read the data file '{path}': {reason}")]
    Summary { path: PathBuf, reason: String },
}
