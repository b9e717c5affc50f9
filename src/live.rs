//! Live channel — the WebSocket side of the SDK.
//!
//! A client holds at most one connection. The stream is split once at
//! connect time; a single spawned task bridges an unbounded outbound
//! channel into the sink and forwards decoded inbound frames to the
//! observer slot. The task ends on socket close, transport error, an
//! outbound close frame, or handle drop. After that, every send reports
//! `NotConnected`. Nothing is buffered across disconnects.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::envelope::TopicList;
use crate::error::Error;

/// Inbound frame callback. Single slot: registering replaces the previous
/// observer.
pub(crate) type Observer = Box<dyn FnMut(Value) + Send>;

type ObserverSlot = Arc<Mutex<Option<Observer>>>;

type Socket =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Handle to one open connection and its I/O task.
pub(crate) struct LiveHandle {
    outbound: mpsc::UnboundedSender<Message>,
    observer: ObserverSlot,
}

impl std::fmt::Debug for LiveHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveHandle")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl LiveHandle {
    /// Open the WebSocket at `url` and spawn its I/O task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WsConnect`] if the handshake fails and
    /// [`Error::ConnectTimeout`] if `timeout` elapses first.
    pub(crate) async fn connect(url: &str, timeout: Option<Duration>) -> Result<Self, Error> {
        let handshake = connect_async(url);
        let (socket, _) = match timeout {
            Some(deadline) => tokio::time::timeout(deadline, handshake)
                .await
                .map_err(|_| Error::ConnectTimeout)?,
            None => handshake.await,
        }
        .map_err(|error| Error::WsConnect(Box::new(error)))?;

        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let observer: ObserverSlot = Arc::new(Mutex::new(None));
        tokio::spawn(run_socket(socket, outbound_rx, Arc::clone(&observer)));

        tracing::debug!(%url, "websocket connected");
        Ok(Self { outbound, observer })
    }

    /// Whether the I/O task is still servicing the socket.
    pub(crate) fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }

    /// Push the full subscription list as one `{topics: [...]}` frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] when the socket is gone.
    pub(crate) fn send_topics(&self, topics: &[String]) -> Result<(), Error> {
        let frame = serde_json::to_string(&TopicList {
            topics: topics.to_vec(),
        })?;
        self.outbound
            .send(Message::Text(frame.into()))
            .map_err(|_| Error::NotConnected)
    }

    /// Install `observer`, replacing any previously registered callback.
    pub(crate) fn set_observer(&self, observer: Observer) {
        let mut slot = self.observer.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(observer);
    }

    /// Normal closure: code 1000, reason "User Disconnect". The I/O task
    /// forwards the close frame and exits, closing the outbound channel
    /// behind it. Dropping an already-dead handle is a no-op.
    pub(crate) fn close(self) {
        let close = Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "User Disconnect".into(),
        }));
        let _ = self.outbound.send(close);
    }
}

/// Socket I/O loop: outbound channel → sink, inbound frames → observer.
async fn run_socket(
    socket: Socket,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    observer: ObserverSlot,
) {
    let (mut sink, mut source) = socket.split();

    loop {
        tokio::select! {
            frame = outbound.recv() => {
                let Some(frame) = frame else {
                    // Handle dropped without an explicit close.
                    let _ = sink.close().await;
                    break;
                };
                let closing = matches!(frame, Message::Close(_));
                if sink.send(frame).await.is_err() {
                    break;
                }
                if closing {
                    break;
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => dispatch(&observer, text.as_str()),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::warn!(%error, "websocket transport error");
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!("websocket task ended");
}

/// Decode one inbound frame and hand it to the observer, if any.
fn dispatch(observer: &ObserverSlot, text: &str) {
    let value = match serde_json::from_str::<Value>(text) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "discarding non-JSON inbound frame");
            return;
        }
    };

    let mut slot = observer.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(callback) = slot.as_mut() {
        callback(value);
    }
}

#[cfg(test)]
#[path = "live_test.rs"]
mod tests;
