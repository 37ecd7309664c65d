//! Per-observer connection lifecycle.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Track connection state (Connecting → Registered → Active → Closed)
//! - Run the inbound liveness loop and the outbound delivery loop
//!
//! The inbound loop carries no application protocol. It only notices the peer
//! going away, then unregisters from the hub. The outbound loop drains the
//! connection's queue and closes the transport once the hub drops the queue.

use std::fmt::Display;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::broadcast::hub::{HubHandle, Subscriber};
use crate::broadcast::message::BroadcastMessage;

/// Process-wide counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an observer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection state. Moves forward only; `Closed` is terminal.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting = 0,
    Registered = 1,
    Active = 2,
    Closed = 3,
}

impl From<u8> for ConnectionState {
    fn from(val: u8) -> Self {
        match val {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Registered,
            2 => ConnectionState::Active,
            _ => ConnectionState::Closed,
        }
    }
}

/// One live observer bound to the hub.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    state: Arc<AtomicU8>,
    hub: HubHandle,
}

impl Connection {
    pub fn new(hub: HubHandle) -> Self {
        Self {
            id: ConnectionId::new(),
            state: Arc::new(AtomicU8::new(ConnectionState::Connecting as u8)),
            hub,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::SeqCst))
    }

    /// Move to `next` if it is ahead of the current state.
    fn advance(&self, next: ConnectionState) -> bool {
        self.state
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (next > ConnectionState::from(current)).then_some(next as u8)
            })
            .is_ok()
    }

    /// Create the outbound queue and hand its sending half to the hub.
    ///
    /// `initial` messages are queued ahead of anything the hub delivers.
    pub fn register(
        &self,
        capacity: usize,
        initial: Option<BroadcastMessage>,
    ) -> mpsc::Receiver<BroadcastMessage> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        if let Some(message) = initial {
            let _ = tx.try_send(message);
        }
        self.hub.register(Subscriber::new(self.id, tx));
        self.advance(ConnectionState::Registered);
        rx
    }

    /// Drive both loops over a duplex transport until either side ends.
    pub async fn serve<T, E>(self, transport: T, outbound: mpsc::Receiver<BroadcastMessage>)
    where
        T: Stream<Item = Result<Message, E>> + Sink<Message, Error = E> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (sink, stream) = transport.split();

        self.advance(ConnectionState::Active);
        let writer = tokio::spawn(write_loop(self.clone(), sink, outbound));

        read_loop(&self, stream).await;
        self.hub.unregister(self.id);

        if let Err(e) = writer.await {
            tracing::error!(connection_id = %self.id, error = %e, "Write loop panicked");
        }
        self.advance(ConnectionState::Closed);
    }
}

/// Consume inbound frames until the peer closes or the transport fails.
async fn read_loop<S, E>(connection: &Connection, mut stream: S)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: Display,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(connection_id = %connection.id, error = %e, "Observer read error");
                break;
            }
        }
    }
    connection.advance(ConnectionState::Closed);
}

/// Deliver queued messages until the queue closes, then close the transport.
async fn write_loop<S, E>(
    connection: Connection,
    mut sink: S,
    mut outbound: mpsc::Receiver<BroadcastMessage>,
) where
    S: Sink<Message, Error = E> + Unpin,
    E: Display,
{
    while let Some(message) = outbound.recv().await {
        let text = match message.encode() {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(connection_id = %connection.id, error = %e, "Skipping message");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(text.into())).await {
            tracing::debug!(connection_id = %connection.id, error = %e, "Observer write error");
            connection.advance(ConnectionState::Closed);
            return;
        }
    }

    connection.advance(ConnectionState::Closed);
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
