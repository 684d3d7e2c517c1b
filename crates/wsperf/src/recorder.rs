use chrono::{Local, NaiveDateTime};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::errors::WsPerfError;

/// Summary of one finished run, persisted as `{results_dir}/{version}.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub timestamp: NaiveDateTime,
    /// Milliseconds from the first connect until every connection closed.
    pub time_taken: u64,
    #[serde(rename = "quarkusVersion")]
    pub version: String,
    pub number_of_clients: usize,
    pub number_of_messages: usize,
}

impl RunResult {
    pub fn new(config: &RunConfig, time_taken: u64, version: &str) -> Self {
        RunResult {
            timestamp: Local::now().naive_local(),
            time_taken,
            version: version.to_owned(),
            number_of_clients: config.number_of_clients,
            number_of_messages: config.number_of_messages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResultRecorder {
    results_dir: PathBuf,
}

impl ResultRecorder {
    pub fn new<P: AsRef<Path>>(results_dir: P) -> Self {
        ResultRecorder {
            results_dir: results_dir.as_ref().to_owned(),
        }
    }

    pub fn result_path(&self, version: &str) -> PathBuf {
        self.results_dir.join(format!("{}.json", file_stem(version)))
    }

    /// Writes the result, replacing any earlier run of the same version.
    pub fn record(&self, result: &RunResult) -> Result<PathBuf, WsPerfError> {
        let path = self.result_path(&result.version);
        fs::create_dir_all(&self.results_dir).map_err(|source| WsPerfError::Write {
            path: self.results_dir.clone(),
            source,
        })?;
        let json = serde_json::to_string(result)?;
        fs::write(&path, json).map_err(|source| WsPerfError::Write {
            path: path.clone(),
            source,
        })?;
        info!("Result written to {}", path.display());
        Ok(path)
    }
}

// The version comes from the server, keep it inside the results directory.
fn file_stem(version: &str) -> String {
    version
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim_start_matches('.')
        .to_owned()
}
