//! Stop signal shared by the broadcast hub and both listeners.

use tokio::sync::broadcast;

/// Fans one stop signal out to the three tasks `HttpServer::run` drives.
///
/// On the signal the hub coordinator drops every observer queue, which closes
/// live feed connections, while the proxy and web listeners drain in-flight
/// requests through axum's graceful shutdown.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fired from the Ctrl+C task in `main`, or directly by tests.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Receivers still alive; zero once the server has fully stopped.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` sees the signal or its sender is gone.
pub async fn wait_for(mut rx: broadcast::Receiver<()>) {
    let _ = rx.recv().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_reaches_hub_and_both_listeners() {
        let shutdown = Shutdown::new();
        let hub = tokio::spawn(wait_for(shutdown.subscribe()));
        let proxy = tokio::spawn(wait_for(shutdown.subscribe()));
        let web = tokio::spawn(wait_for(shutdown.subscribe()));
        assert_eq!(shutdown.receiver_count(), 3);

        shutdown.trigger();

        tokio::time::timeout(Duration::from_secs(1), async {
            hub.await.unwrap();
            proxy.await.unwrap();
            web.await.unwrap();
        })
        .await
        .unwrap();
        assert_eq!(shutdown.receiver_count(), 0);
    }

    #[tokio::test]
    async fn dropping_coordinator_releases_waiters() {
        let shutdown = Shutdown::new();
        let waiter = tokio::spawn(wait_for(shutdown.subscribe()));
        drop(shutdown);

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
