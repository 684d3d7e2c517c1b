use dashmap::DashMap;
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::RunConfig;
use crate::connection::{self, ConnectionHandle, ConnectionStatus};
use crate::errors::WsPerfError;
use crate::latch::CountdownLatch;
use crate::state::RunState;

/// Owns every connection of a run from connect until close.
#[derive(Debug)]
pub struct ConnectionPool {
    handles: Vec<ConnectionHandle>,
    statuses: Arc<DashMap<usize, ConnectionStatus>>,
}

impl ConnectionPool {
    /// Opens `number_of_clients` connections concurrently.
    ///
    /// Any single connect failure, or the timeout, aborts the whole pool.
    /// Connections opened before the abort, and those whose handshake
    /// completes after it, are closed in the background.
    pub async fn connect_all(
        config: &RunConfig,
        state: Arc<RunState>,
    ) -> Result<Self, WsPerfError> {
        let expected = config.number_of_clients;
        let url = Arc::new(config.server_url());
        let statuses = Arc::new(DashMap::<usize, ConnectionStatus>::new());
        let opened = Arc::new(DashMap::<usize, ConnectionHandle>::new());
        let connected_latch = Arc::new(CountdownLatch::new(expected));
        let abandoned = Arc::new(AtomicBool::new(false));
        let (tx_failure, mut rx_failure) = mpsc::unbounded_channel();

        info!("Connecting {expected} clients to {url}");
        for id in 0..expected {
            statuses.insert(id, ConnectionStatus::Connecting);
            let url = url.clone();
            let state = state.clone();
            let statuses = statuses.clone();
            let opened = opened.clone();
            let connected_latch = connected_latch.clone();
            let abandoned = abandoned.clone();
            let tx_failure = tx_failure.clone();
            tokio::spawn(async move {
                match connection::connect(id, &url, state.clone()).await {
                    Ok(handle) => {
                        statuses.insert(id, ConnectionStatus::Open);
                        opened.insert(id, handle);
                        state.record_connected();
                        connected_latch.count_down();
                        // whoever removes the handle first closes it
                        if abandoned.load(Ordering::SeqCst) {
                            if let Some((_, handle)) = opened.remove(&id) {
                                close_abandoned(handle);
                            }
                        }
                    }
                    Err(source) => {
                        statuses.remove(&id);
                        let _ = tx_failure.send(WsPerfError::Connect { id, source });
                    }
                }
            });
        }
        // only the spawned tasks keep the failure channel open
        drop(tx_failure);

        let connected = tokio::select! {
            all_open = connected_latch.wait(config.timeout()) => {
                if all_open {
                    Ok(())
                } else {
                    Err(WsPerfError::ConnectTimeout {
                        opened: expected - connected_latch.count(),
                        expected,
                        timeout_secs: config.timeout_secs,
                    })
                }
            }
            Some(failure) = rx_failure.recv() => Err(failure),
        };
        if let Err(failure) = connected {
            abandoned.store(true, Ordering::SeqCst);
            let ids: Vec<usize> = opened.iter().map(|entry| *entry.key()).collect();
            for id in ids {
                if let Some((_, handle)) = opened.remove(&id) {
                    close_abandoned(handle);
                }
            }
            return Err(failure);
        }

        let mut handles: Vec<ConnectionHandle> =
            opened.iter().map(|entry| entry.value().clone()).collect();
        handles.sort_by_key(ConnectionHandle::id);
        info!("{} clients connected", handles.len());

        Ok(ConnectionPool { handles, statuses })
    }

    #[cfg(test)]
    pub(crate) fn from_handles(handles: Vec<ConnectionHandle>) -> Self {
        let statuses = handles
            .iter()
            .map(|handle| (handle.id(), ConnectionStatus::Open))
            .collect();
        ConnectionPool {
            handles,
            statuses: Arc::new(statuses),
        }
    }

    pub fn handles(&self) -> &[ConnectionHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn status(&self, id: usize) -> Option<ConnectionStatus> {
        self.statuses.get(&id).map(|status| *status)
    }

    pub fn count_with_status(&self, status: ConnectionStatus) -> usize {
        self.statuses.iter().filter(|entry| *entry.value() == status).count()
    }

    pub fn mark_all(&self, status: ConnectionStatus) {
        for handle in &self.handles {
            self.statuses.insert(handle.id(), status);
        }
    }

    /// Closes every connection concurrently. Consumes the pool: the statuses
    /// of the closed connections are returned for inspection.
    pub async fn close_all(
        self,
        timeout: Duration,
    ) -> Result<Arc<DashMap<usize, ConnectionStatus>>, WsPerfError> {
        let expected = self.handles.len();
        info!("Closing {expected} clients");
        let closed_latch = Arc::new(CountdownLatch::new(expected));
        let (tx_failure, mut rx_failure) = mpsc::unbounded_channel();

        for handle in self.handles {
            self.statuses.insert(handle.id(), ConnectionStatus::Closing);
            let statuses = self.statuses.clone();
            let closed_latch = closed_latch.clone();
            let tx_failure = tx_failure.clone();
            tokio::spawn(async move {
                match handle.close().await {
                    Ok(()) => {
                        statuses.insert(handle.id(), ConnectionStatus::Closed);
                        closed_latch.count_down();
                    }
                    Err(failure) => {
                        warn!("{failure}");
                        let _ = tx_failure.send(failure);
                    }
                }
            });
        }
        drop(tx_failure);

        tokio::select! {
            all_closed = closed_latch.wait(timeout) => {
                if !all_closed {
                    return Err(WsPerfError::CloseTimeout {
                        closed: expected - closed_latch.count(),
                        expected,
                        timeout_secs: timeout.as_secs(),
                    });
                }
            }
            Some(failure) = rx_failure.recv() => return Err(failure),
        }

        Ok(self.statuses)
    }
}

fn close_abandoned(handle: ConnectionHandle) {
    tokio::spawn(async move {
        match handle.close().await {
            Ok(()) => debug!("[{}] Closed after the pool was abandoned", handle.id()),
            Err(e) => debug!("{e}"),
        }
    });
}
