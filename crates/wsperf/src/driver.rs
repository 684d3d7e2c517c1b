use log::{info, warn};
use tokio::time;
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::config::RunConfig;
use crate::connection::ConnectionStatus;
use crate::constants::PAYLOAD;
use crate::pool::ConnectionPool;
use crate::state::RunState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Every message sent and every reply received within the timeout.
    Completed,
    /// Some sends did not complete within the timeout.
    SendTimeout { pending: usize },
    /// At least one send failed, replies were not awaited.
    SendFailures { failures: u64 },
    /// All sends succeeded but some replies never arrived.
    ReceiveTimeout { missing: usize },
    /// All replies arrived, some of them with unexpected content.
    ContentMismatch { mismatches: u64 },
}

impl ExchangeOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExchangeOutcome::Completed)
    }
}

/// Sends the payload `number_of_messages` times on every pooled connection
/// and waits for the replies.
///
/// Sends of one round are only queued; the optional message interval pauses
/// the whole driver between rounds. Replies are awaited only when every send
/// succeeded.
pub async fn run_exchange(
    pool: &ConnectionPool,
    config: &RunConfig,
    state: &RunState,
) -> ExchangeOutcome {
    let payload = Utf8Bytes::from_static(PAYLOAD);
    let rounds = config.number_of_messages;
    pool.mark_all(ConnectionStatus::Messaging);

    for round in 0..rounds {
        for handle in pool.handles() {
            if !handle.send_text(payload.clone()) {
                warn!("[{}] Connection is gone, message not sent", handle.id());
                state.record_send(false);
            }
        }
        if let Some(interval) = config.message_interval {
            if round + 1 < rounds {
                info!(
                    "Message {} sent, wait for {} ms",
                    round + 1,
                    interval.as_millis()
                );
                time::sleep(interval).await;
            }
        }
    }

    let timeout = config.timeout();
    if !state.sent_latch().wait(timeout).await {
        let pending = state.sent_latch().count();
        warn!("Unable to send all messages in time, {pending} still pending");
        return ExchangeOutcome::SendTimeout { pending };
    }

    let failures = state.send_failures();
    if failures > 0 {
        warn!(
            "{failures} failures when sending {rounds} messages with {} clients",
            pool.len()
        );
        return ExchangeOutcome::SendFailures { failures };
    }
    info!("{rounds} messages sent to each connected client");

    if !state.received_latch().wait(timeout).await {
        let missing = state.received_latch().count();
        warn!("Incorrect number of replies received: {missing} missing");
        return ExchangeOutcome::ReceiveTimeout { missing };
    }

    let mismatches = state.mismatches();
    if mismatches > 0 {
        warn!("{mismatches} replies did not match the expected content");
        return ExchangeOutcome::ContentMismatch { mismatches };
    }
    ExchangeOutcome::Completed
}
