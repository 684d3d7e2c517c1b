use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::errors::WsPerfError;
use crate::state::RunState;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Open,
    Messaging,
    Closing,
    Closed,
}

/// Commands consumed by the writer task of one connection, in order.
#[derive(Debug)]
pub enum Outbound {
    Text(Utf8Bytes),
    Close(oneshot::Sender<Result<(), tungstenite::Error>>),
}

/// Handle to one live connection. Sending only enqueues: completions are
/// reported to the [`RunState`] by the writer task.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: usize,
    tx_outbound: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    pub(crate) fn new(id: usize, tx_outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        ConnectionHandle { id, tx_outbound }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns `false` when the writer task is gone and nothing was queued.
    pub fn send_text(&self, payload: Utf8Bytes) -> bool {
        self.tx_outbound.send(Outbound::Text(payload)).is_ok()
    }

    /// Queues a close frame behind any pending sends and waits for it.
    pub async fn close(&self) -> Result<(), WsPerfError> {
        let (tx_done, rx_done) = oneshot::channel();
        self.tx_outbound
            .send(Outbound::Close(tx_done))
            .map_err(|_| WsPerfError::Close {
                id: self.id,
                reason: "writer task terminated".to_owned(),
            })?;
        match rx_done.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(WsPerfError::Close {
                id: self.id,
                reason: e.to_string(),
            }),
            Err(_) => Err(WsPerfError::Close {
                id: self.id,
                reason: "writer task dropped the close request".to_owned(),
            }),
        }
    }
}

/// Opens one connection and spawns its reader and writer tasks.
///
/// The handshake request carries no `Origin` header.
pub async fn connect(
    id: usize,
    url: &str,
    state: Arc<RunState>,
) -> Result<ConnectionHandle, tungstenite::Error> {
    let request = url.into_client_request()?;
    let (ws, _response) = connect_async(request).await?;
    debug!("[{id}] Connected to {url}");

    let (sink, stream) = ws.split();
    let (tx_outbound, rx_outbound) = mpsc::unbounded_channel::<Outbound>();

    tokio::spawn(connection_reader_task(stream, id, state.clone()));
    tokio::spawn(connection_writer_task(sink, id, rx_outbound, state));

    Ok(ConnectionHandle::new(id, tx_outbound))
}

async fn connection_reader_task(
    mut stream: SplitStream<WsStream>,
    client_id: usize,
    state: Arc<RunState>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => state.handle_inbound(client_id, text.as_str()),
            Ok(Message::Close(frame)) => {
                debug!("[{client_id}] Server closed the connection: {frame:?}");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                debug!("[{client_id}] Read failed: {e}");
                break;
            }
        }
    }
}

async fn connection_writer_task(
    mut sink: SplitSink<WsStream, Message>,
    client_id: usize,
    mut rx_outbound: mpsc::UnboundedReceiver<Outbound>,
    state: Arc<RunState>,
) {
    while let Some(command) = rx_outbound.recv().await {
        match command {
            Outbound::Text(payload) => match sink.send(Message::Text(payload)).await {
                Ok(()) => state.record_send(true),
                Err(e) => {
                    error!("[{client_id}] Error sending a message: {e}");
                    state.record_send(false);
                }
            },
            Outbound::Close(tx_done) => {
                let result = match sink.close().await {
                    Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                        Ok(())
                    }
                    other => other,
                };
                let _ = tx_done.send(result);
                break;
            }
        }
    }
}
