use log::{debug, error, info};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::PAYLOAD;
use crate::latch::CountdownLatch;
use crate::protocol::{InboundMessage, expected_reply};

/// Counters and barriers shared by every connection task of one run.
///
/// Counters only grow; they are written concurrently from the reader and
/// writer tasks and never reset within a run.
#[derive(Debug)]
pub struct RunState {
    total_messages: usize,
    progress_step: usize,
    expected_reply: String,
    connected: AtomicU64,
    sent: AtomicU64,
    send_failures: AtomicU64,
    received: AtomicU64,
    mismatches: AtomicU64,
    server_version: OnceLock<String>,
    sent_latch: CountdownLatch,
    received_latch: CountdownLatch,
}

impl RunState {
    pub fn new(total_messages: usize) -> Self {
        RunState {
            total_messages,
            progress_step: (total_messages / 10).max(1),
            expected_reply: expected_reply(PAYLOAD),
            connected: AtomicU64::new(0),
            sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            received: AtomicU64::new(0),
            mismatches: AtomicU64::new(0),
            server_version: OnceLock::new(),
            sent_latch: CountdownLatch::new(total_messages),
            received_latch: CountdownLatch::new(total_messages),
        }
    }

    pub fn record_connected(&self) {
        self.connected.fetch_add(1, Ordering::Relaxed);
    }

    /// Completion of one send, successful or not.
    pub fn record_send(&self, succeeded: bool) {
        if succeeded {
            self.sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.send_failures.fetch_add(1, Ordering::Relaxed);
        }
        match self.sent_latch.count_down() {
            Some(remaining) if remaining % self.progress_step == 0 => {
                info!("{} messages sent", self.total_messages - remaining);
            }
            Some(_) => {}
            None => debug!("Send completed after all expected sends were counted"),
        }
    }

    /// Inbound text handler attached to every connection.
    pub fn handle_inbound(&self, client_id: usize, text: &str) {
        match InboundMessage::classify(text) {
            InboundMessage::VersionTag(version) => {
                if self.set_server_version(version) {
                    info!("[{client_id}] Server version: {version}");
                }
            }
            InboundMessage::Reply(reply) => {
                if reply != self.expected_reply {
                    self.mismatches.fetch_add(1, Ordering::Relaxed);
                    error!("[{client_id}] Received invalid message from the server: {reply}");
                }
                match self.received_latch.count_down() {
                    Some(remaining) => {
                        self.received.fetch_add(1, Ordering::Relaxed);
                        if remaining % self.progress_step == 0 {
                            info!("{} messages received", self.total_messages - remaining);
                        }
                    }
                    None => debug!("[{client_id}] Unexpected extra reply: {reply}"),
                }
            }
        }
    }

    /// First non-empty tag wins; returns whether this call set it.
    pub fn set_server_version(&self, version: &str) -> bool {
        if version.is_empty() {
            return false;
        }
        self.server_version.set(version.to_owned()).is_ok()
    }

    pub fn server_version(&self) -> Option<&str> {
        self.server_version.get().map(String::as_str)
    }

    pub fn total_messages(&self) -> usize {
        self.total_messages
    }

    pub fn connected(&self) -> u64 {
        self.connected.load(Ordering::Relaxed)
    }

    pub fn sent(&self) -> u64 {
        self.sent.load(Ordering::Relaxed)
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    pub fn mismatches(&self) -> u64 {
        self.mismatches.load(Ordering::Relaxed)
    }

    pub fn sent_latch(&self) -> &CountdownLatch {
        &self.sent_latch
    }

    pub fn received_latch(&self) -> &CountdownLatch {
        &self.received_latch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_send() {
        let state = RunState::new(3);
        state.record_send(true);
        state.record_send(false);
        state.record_send(true);
        assert_eq!(state.sent(), 2);
        assert_eq!(state.send_failures(), 1);
        assert!(state.sent_latch().is_open());

        // late completion after the latch opened
        state.record_send(true);
        assert_eq!(state.sent_latch().count(), 0);
    }

    #[test]
    fn test_replies_and_mismatches() {
        let state = RunState::new(2);
        state.handle_inbound(0, "foo");
        state.handle_inbound(1, "FOO");
        assert_eq!(state.received(), 2);
        assert_eq!(state.mismatches(), 1);
        assert!(state.received_latch().is_open());

        state.handle_inbound(1, "foo");
        assert_eq!(state.received(), 2);
    }

    #[test]
    fn test_version_tag_does_not_count_as_reply() {
        let state = RunState::new(1);
        state.handle_inbound(0, "_1.2.0");
        assert_eq!(state.server_version(), Some("1.2.0"));
        assert_eq!(state.received(), 0);
        assert_eq!(state.received_latch().count(), 1);
    }

    #[test]
    fn test_first_version_wins() {
        let state = RunState::new(1);
        assert!(!state.set_server_version(""));
        assert!(state.set_server_version("1.0.0"));
        assert!(!state.set_server_version("2.0.0"));
        assert_eq!(state.server_version(), Some("1.0.0"));
    }

    #[test]
    fn test_concurrent_version_tags() {
        let state = Arc::new(RunState::new(1));
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let state = state.clone();
                std::thread::spawn(move || {
                    let won = state.set_server_version(&format!("{i}.0.0"));
                    (i, won)
                })
            })
            .collect();

        let winners: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|(_, won)| *won)
            .collect();
        assert_eq!(winners.len(), 1);
        let expected = format!("{}.0.0", winners[0].0);
        assert_eq!(state.server_version(), Some(expected.as_str()));
    }
}
