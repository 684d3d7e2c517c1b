//! Local servers and connection stand-ins used by the async tests.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use crate::config::RunConfig;
use crate::connection::{ConnectionHandle, Outbound};
use crate::protocol::to_lower_case;
use crate::state::RunState;

pub(crate) fn test_config(addr: SocketAddr, clients: usize, messages: usize) -> RunConfig {
    RunConfig {
        number_of_clients: clients,
        number_of_messages: messages,
        server_host: addr.ip().to_string(),
        server_port: addr.port(),
        timeout_secs: 5,
        ..RunConfig::default()
    }
}

/// Writer stand-in: completes sends locally and answers with `reply`.
pub(crate) fn stub_connection(
    id: usize,
    state: Arc<RunState>,
    failing_sends: usize,
    reply: Option<&'static str>,
) -> ConnectionHandle {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut failures_left = failing_sends;
        while let Some(command) = rx.recv().await {
            match command {
                Outbound::Text(_) if failures_left > 0 => {
                    failures_left -= 1;
                    state.record_send(false);
                }
                Outbound::Text(_) => {
                    state.record_send(true);
                    if let Some(reply) = reply {
                        state.handle_inbound(id, reply);
                    }
                }
                Outbound::Close(tx_done) => {
                    let _ = tx_done.send(Ok(()));
                    break;
                }
            }
        }
    });
    ConnectionHandle::new(id, tx)
}

/// The endpoint under test: announces `_<version>` then lower-cases every text.
pub(crate) async fn spawn_lower_case_server(version: Option<&str>) -> SocketAddr {
    let version = version.map(str::to_owned);
    spawn_server(move |socket| serve_lower_case(socket, version.clone(), true)).await
}

/// Announces `_<version>` and swallows everything afterwards.
pub(crate) async fn spawn_mute_server(version: &str) -> SocketAddr {
    let version = Some(version.to_owned());
    spawn_server(move |socket| serve_lower_case(socket, version.clone(), false)).await
}

/// Accepts TCP connections but never answers the WebSocket handshake.
pub(crate) async fn spawn_silent_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr
}

/// Delays every handshake by `delay`, then counts the connections the
/// client closed.
pub(crate) async fn spawn_slow_server(delay: Duration, closed: Arc<AtomicUsize>) -> SocketAddr {
    spawn_server(move |socket| {
        let closed = closed.clone();
        async move {
            time::sleep(delay).await;
            let Ok(mut ws) = accept_async(socket).await else {
                return;
            };
            while let Some(Ok(message)) = ws.next().await {
                if message.is_close() {
                    closed.fetch_add(1, Ordering::SeqCst);
                    break;
                }
            }
        }
    })
    .await
}

/// A port nobody listens on.
pub(crate) async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn spawn_server<F, Fut>(handler: F) -> SocketAddr
where
    F: Fn(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(handler(socket));
        }
    });
    addr
}

async fn serve_lower_case(socket: TcpStream, version: Option<String>, reply: bool) {
    let Ok(mut ws) = accept_async(socket).await else {
        return;
    };
    if let Some(version) = version {
        if ws.send(Message::text(format!("_{version}"))).await.is_err() {
            return;
        }
    }
    while let Some(Ok(message)) = ws.next().await {
        match message {
            Message::Text(text) if reply => {
                let lower = to_lower_case(text.as_str());
                if ws.send(Message::text(lower)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}
