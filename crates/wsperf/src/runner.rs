use log::{info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::config::RunConfig;
use crate::constants::{EXIT_DEGRADED, EXIT_SUCCESS, UNKNOWN_VERSION};
use crate::driver::{ExchangeOutcome, run_exchange};
use crate::errors::WsPerfError;
use crate::pool::ConnectionPool;
use crate::recorder::{ResultRecorder, RunResult};
use crate::state::RunState;

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: ExchangeOutcome,
    pub result: RunResult,
    pub result_path: PathBuf,
    pub sent: u64,
    pub send_failures: u64,
    pub received: u64,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            EXIT_SUCCESS
        } else {
            EXIT_DEGRADED
        }
    }
}

/// Runs the whole benchmark: connect, exchange, close, record.
///
/// Connect and close problems abort the run before anything is recorded.
/// A degraded exchange is still recorded and reported through the outcome.
pub async fn run(config: &RunConfig) -> Result<RunReport, WsPerfError> {
    info!(
        "Test client started [number-of-clients: {}, number-of-messages: {}, server: {}]",
        config.number_of_clients,
        config.number_of_messages,
        config.server_url()
    );
    let started = Instant::now();
    let state = Arc::new(RunState::new(config.total_messages()));

    let pool = ConnectionPool::connect_all(config, state.clone()).await?;
    exchange_and_record(config, &state, pool, started).await
}

/// Everything after the pool is open: exchange, close, record.
pub(crate) async fn exchange_and_record(
    config: &RunConfig,
    state: &RunState,
    pool: ConnectionPool,
    started: Instant,
) -> Result<RunReport, WsPerfError> {
    let outcome = run_exchange(&pool, config, state).await;
    pool.close_all(config.timeout()).await?;

    let time_taken = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if outcome.is_success() {
        info!("Finished in {time_taken} ms");
    } else {
        warn!("Failed in {time_taken} ms: {outcome:?}");
    }

    let version = state.server_version().unwrap_or_else(|| {
        warn!("The server did not announce its version");
        UNKNOWN_VERSION
    });
    let result = RunResult::new(config, time_taken, version);
    let result_path = ResultRecorder::new(&config.results_dir).record(&result)?;

    Ok(RunReport {
        outcome,
        result,
        result_path,
        sent: state.sent(),
        send_failures: state.send_failures(),
        received: state.received(),
    })
}
