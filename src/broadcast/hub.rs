//! Fan-out coordinator for live observers.
//!
//! # Responsibilities
//! - Own the observer set; nothing else touches it
//! - Process register/unregister/publish commands one at a time
//! - Deliver each message to every observer's bounded outbound queue
//!
//! # Design Decisions
//! - Single-owner task instead of a lock around the observer set
//! - Control commands travel on an unbounded mailbox and are polled first,
//!   so a registration always takes effect before later publishes
//! - Publishes travel on a bounded inbox; when it is full the message is dropped
//!   and the producer moves on
//! - An observer whose queue is full is disconnected, never waited on

use std::collections::HashMap;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::broadcast::connection::ConnectionId;
use crate::broadcast::message::BroadcastMessage;
use crate::config::BroadcastConfig;
use crate::observability::metrics;

/// An observer as seen by the hub: an id and the sending half of its queue.
#[derive(Debug)]
pub struct Subscriber {
    id: ConnectionId,
    outbound: mpsc::Sender<BroadcastMessage>,
}

impl Subscriber {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<BroadcastMessage>) -> Self {
        Self { id, outbound }
    }

    /// Create a subscriber with a fresh id and a queue of `capacity` messages.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<BroadcastMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(ConnectionId::new(), tx), rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

enum Control {
    Register(Subscriber),
    Unregister(ConnectionId),
    Count(oneshot::Sender<usize>),
}

/// Cloneable entry point to a running [`BroadcastHub`].
#[derive(Debug, Clone)]
pub struct HubHandle {
    control: mpsc::UnboundedSender<Control>,
    inbox: mpsc::Sender<BroadcastMessage>,
}

impl HubHandle {
    /// Add an observer. Returns immediately; the hub applies it in order.
    pub fn register(&self, subscriber: Subscriber) {
        let id = subscriber.id;
        if self.control.send(Control::Register(subscriber)).is_err() {
            tracing::debug!(connection_id = %id, "Hub stopped, registration ignored");
        }
    }

    /// Remove an observer and close its outbound queue.
    pub fn unregister(&self, id: ConnectionId) {
        let _ = self.control.send(Control::Unregister(id));
    }

    /// Offer a message for fan-out without waiting.
    ///
    /// Returns `false` when the inbox is saturated (or the hub has stopped)
    /// and the message was dropped.
    pub fn publish(&self, message: BroadcastMessage) -> bool {
        match self.inbox.try_send(message) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(message)) => {
                tracing::debug!(kind = message.kind(), "Hub inbox full, dropping message");
                metrics::record_broadcast_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Ask the coordinator how many observers it currently holds.
    pub async fn observer_count(&self) -> Option<usize> {
        let (tx, rx) = oneshot::channel();
        self.control.send(Control::Count(tx)).ok()?;
        rx.await.ok()
    }
}

/// The coordinator. Create with [`BroadcastHub::new`] and drive with [`BroadcastHub::run`].
pub struct BroadcastHub {
    control: mpsc::UnboundedReceiver<Control>,
    inbox: mpsc::Receiver<BroadcastMessage>,
    observers: HashMap<ConnectionId, mpsc::Sender<BroadcastMessage>>,
}

impl BroadcastHub {
    pub fn new(config: &BroadcastConfig) -> (Self, HubHandle) {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::channel(config.inbox_capacity.max(1));

        let hub = Self {
            control: control_rx,
            inbox: inbox_rx,
            observers: HashMap::new(),
        };
        let handle = HubHandle {
            control: control_tx,
            inbox: inbox_tx,
        };
        (hub, handle)
    }

    /// Process commands until shutdown or until every handle is dropped.
    ///
    /// On exit all outbound queues are dropped, which closes every observer.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!("Broadcast hub started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                Some(control) = self.control.recv() => self.handle_control(control),
                Some(message) = self.inbox.recv() => self.fan_out(message),
                else => break,
            }
        }

        let remaining = self.observers.len();
        self.observers.clear();
        metrics::set_observers(0);
        tracing::info!(observers = remaining, "Broadcast hub stopped");
    }

    fn handle_control(&mut self, control: Control) {
        match control {
            Control::Register(subscriber) => {
                self.observers.insert(subscriber.id, subscriber.outbound);
                metrics::set_observers(self.observers.len());
                tracing::info!(
                    connection_id = %subscriber.id,
                    observers = self.observers.len(),
                    "Observer connected"
                );
            }
            Control::Unregister(id) => {
                // Dropping the sender closes the observer's queue.
                if self.observers.remove(&id).is_some() {
                    metrics::set_observers(self.observers.len());
                    tracing::info!(
                        connection_id = %id,
                        observers = self.observers.len(),
                        "Observer disconnected"
                    );
                }
            }
            Control::Count(reply) => {
                let _ = reply.send(self.observers.len());
            }
        }
    }

    fn fan_out(&mut self, message: BroadcastMessage) {
        let before = self.observers.len();

        self.observers.retain(|id, outbound| match outbound.try_send(message.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    connection_id = %id,
                    "Observer queue full, disconnecting"
                );
                metrics::record_observer_dropped();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(connection_id = %id, "Observer queue closed");
                false
            }
        });

        if self.observers.len() != before {
            metrics::set_observers(self.observers.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::exchange::fixtures::exchange;
    use crate::lifecycle::Shutdown;
    use std::sync::Arc;
    use std::time::Duration;

    fn config(inbox_capacity: usize) -> BroadcastConfig {
        BroadcastConfig {
            inbox_capacity,
            ..BroadcastConfig::default()
        }
    }

    fn new_log(url: &str) -> BroadcastMessage {
        BroadcastMessage::NewExchange(Arc::new(exchange("GET", url, 200)))
    }

    fn url_of(message: &BroadcastMessage) -> String {
        match message {
            BroadcastMessage::NewExchange(e) => e.url.clone(),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    async fn recv(rx: &mut mpsc::Receiver<BroadcastMessage>) -> Option<BroadcastMessage> {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for hub")
    }

    #[tokio::test]
    async fn delivers_everything_in_order_with_slack() {
        let shutdown = Shutdown::new();
        let (hub, handle) = BroadcastHub::new(&config(64));
        tokio::spawn(hub.run(shutdown.subscribe()));

        let (subscriber, mut rx) = Subscriber::channel(16);
        handle.register(subscriber);

        for i in 0..10 {
            assert!(handle.publish(new_log(&format!("/{i}"))));
        }

        for i in 0..10 {
            let message = recv(&mut rx).await.unwrap();
            assert_eq!(url_of(&message), format!("/{i}"));
        }

        shutdown.trigger();
    }

    #[tokio::test]
    async fn stalled_observer_is_dropped_without_hurting_others() {
        let shutdown = Shutdown::new();
        let (hub, handle) = BroadcastHub::new(&config(64));
        tokio::spawn(hub.run(shutdown.subscribe()));

        let (healthy, mut healthy_rx) = Subscriber::channel(64);
        let (stalled, mut stalled_rx) = Subscriber::channel(1);
        handle.register(healthy);
        handle.register(stalled);

        for i in 0..20 {
            assert!(handle.publish(new_log(&format!("/{i}"))));
        }

        for i in 0..20 {
            let message = recv(&mut healthy_rx).await.unwrap();
            assert_eq!(url_of(&message), format!("/{i}"));
        }

        // The stalled queue held one message, then the hub cut it loose.
        assert_eq!(url_of(&recv(&mut stalled_rx).await.unwrap()), "/0");
        assert!(recv(&mut stalled_rx).await.is_none());
        assert_eq!(handle.observer_count().await, Some(1));

        shutdown.trigger();
    }

    #[tokio::test]
    async fn saturated_inbox_drops_instead_of_blocking() {
        let (_hub, handle) = BroadcastHub::new(&config(2));

        assert!(handle.publish(new_log("/a")));
        assert!(handle.publish(new_log("/b")));
        assert!(!handle.publish(new_log("/c")));
    }

    #[tokio::test]
    async fn unregister_closes_outbound_queue() {
        let shutdown = Shutdown::new();
        let (hub, handle) = BroadcastHub::new(&config(8));
        tokio::spawn(hub.run(shutdown.subscribe()));

        let (subscriber, mut rx) = Subscriber::channel(8);
        let id = subscriber.id();
        handle.register(subscriber);
        assert_eq!(handle.observer_count().await, Some(1));

        handle.unregister(id);
        assert!(recv(&mut rx).await.is_none());
        assert_eq!(handle.observer_count().await, Some(0));

        shutdown.trigger();
    }

    #[tokio::test]
    async fn shutdown_closes_every_observer() {
        let shutdown = Shutdown::new();
        let (hub, handle) = BroadcastHub::new(&config(8));
        let task = tokio::spawn(hub.run(shutdown.subscribe()));

        let (a, mut a_rx) = Subscriber::channel(4);
        let (b, mut b_rx) = Subscriber::channel(4);
        handle.register(a);
        handle.register(b);
        assert_eq!(handle.observer_count().await, Some(2));

        shutdown.trigger();
        task.await.unwrap();

        assert!(recv(&mut a_rx).await.is_none());
        assert!(recv(&mut b_rx).await.is_none());
        assert!(!handle.publish(new_log("/late")));
        assert_eq!(handle.observer_count().await, None);
    }
}
