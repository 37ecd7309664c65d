//! Bounded in-memory exchange log.
//!
//! # Design Decisions
//! - One reader-writer lock guards the whole log; listing takes the read side,
//!   append and clear take the write side
//! - Eviction is strict FIFO once `capacity` is exceeded
//! - Appends notify the hub while still holding the write lock, so the live
//!   feed sees exchanges in insertion order. Publishing never blocks.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use crate::broadcast::{BroadcastMessage, HubHandle};
use crate::capture::exchange::Exchange;
use crate::capture::filter::Filter;

/// Thread-safe, capacity-bounded record of captured exchanges.
#[derive(Debug)]
pub struct LogStore {
    capacity: usize,
    exchanges: RwLock<VecDeque<Arc<Exchange>>>,
    hub: HubHandle,
}

impl LogStore {
    /// Create an empty store that keeps at most `capacity` exchanges.
    pub fn new(capacity: usize, hub: HubHandle) -> Self {
        Self {
            capacity,
            exchanges: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            hub,
        }
    }

    /// Record an exchange, evicting the oldest entries beyond capacity,
    /// then announce it to live observers.
    pub fn append(&self, exchange: Exchange) -> Arc<Exchange> {
        let exchange = Arc::new(exchange);
        let mut exchanges = self.exchanges.write().unwrap_or_else(PoisonError::into_inner);

        exchanges.push_back(Arc::clone(&exchange));
        let mut evicted = 0;
        while exchanges.len() > self.capacity {
            exchanges.pop_front();
            evicted += 1;
        }

        tracing::trace!(
            exchange_id = %exchange.id,
            stored = exchanges.len(),
            evicted,
            "Exchange recorded"
        );

        self.hub
            .publish(BroadcastMessage::NewExchange(Arc::clone(&exchange)));

        exchange
    }

    /// Snapshot of every stored exchange matching `filter`, oldest first.
    pub fn list(&self, filter: &Filter) -> Vec<Arc<Exchange>> {
        let exchanges = self.exchanges.read().unwrap_or_else(PoisonError::into_inner);
        exchanges
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect()
    }

    /// Drop every stored exchange. Capacity is unchanged.
    pub fn clear(&self) {
        let mut exchanges = self.exchanges.write().unwrap_or_else(PoisonError::into_inner);
        let cleared = exchanges.len();
        exchanges.clear();
        tracing::info!(cleared, "Exchange log cleared");
    }

    pub fn len(&self) -> usize {
        self.exchanges
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{BroadcastHub, Subscriber};
    use crate::capture::exchange::fixtures::exchange;
    use crate::config::BroadcastConfig;
    use crate::lifecycle::Shutdown;
    use std::collections::HashSet;
    use std::time::Duration;

    fn idle_store(capacity: usize) -> LogStore {
        let (_hub, handle) = BroadcastHub::new(&BroadcastConfig::default());
        LogStore::new(capacity, handle)
    }

    #[test]
    fn never_exceeds_capacity_and_evicts_oldest() {
        let store = idle_store(3);
        let mut urls = Vec::new();
        for i in 0..10 {
            let url = format!("/item/{i}");
            store.append(exchange("GET", &url, 200));
            urls.push(url);
            assert!(store.len() <= 3);
        }

        let kept: Vec<_> = store
            .list(&Filter::default())
            .iter()
            .map(|e| e.url.clone())
            .collect();
        assert_eq!(kept, &urls[7..]);
    }

    #[test]
    fn list_is_a_snapshot() {
        let store = idle_store(10);
        store.append(exchange("GET", "/a", 200));

        let snapshot = store.list(&Filter::default());
        store.append(exchange("GET", "/b", 200));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn clear_empties_and_keeps_capacity() {
        let store = idle_store(5);
        for _ in 0..4 {
            store.append(exchange("POST", "/x", 201));
        }

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.capacity(), 5);
        let filter = Filter {
            method: Some("POST".into()),
            ..Filter::default()
        };
        assert!(store.list(&filter).is_empty());
        assert!(store.list(&Filter::default()).is_empty());
    }

    #[test]
    fn filtered_listing_keeps_stored_order() {
        let store = idle_store(10);
        store.append(exchange("GET", "/1", 404));
        store.append(exchange("POST", "/2", 404));
        store.append(exchange("GET", "/3", 200));
        store.append(exchange("GET", "/4", 404));

        let filter = Filter {
            method: Some("get".into()),
            status_code: Some(404),
            ..Filter::default()
        };
        let urls: Vec<_> = store.list(&filter).iter().map(|e| e.url.clone()).collect();
        assert_eq!(urls, vec!["/1", "/4"]);
    }

    #[test]
    fn concurrent_appends_lose_nothing() {
        let store = Arc::new(idle_store(1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        store.append(exchange("GET", "/", 200));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let ids: HashSet<_> = store.list(&Filter::default()).iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 400);
    }

    #[tokio::test]
    async fn append_publishes_to_hub() {
        let shutdown = Shutdown::new();
        let (hub, handle) = BroadcastHub::new(&BroadcastConfig::default());
        tokio::spawn(hub.run(shutdown.subscribe()));

        let (subscriber, mut rx) = Subscriber::channel(8);
        handle.register(subscriber);

        let store = LogStore::new(10, handle);
        let recorded = store.append(exchange("PUT", "/live", 204));

        let message = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        match message {
            BroadcastMessage::NewExchange(e) => assert_eq!(e.id, recorded.id),
            other => panic!("unexpected message: {other:?}"),
        }

        shutdown.trigger();
    }
}
