use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;

use crate::service::stats::ServiceStats;

pub type ClientId = u64;

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 8;

/// Registry of connected clients and their outbound queues.
///
/// Dropping a client's sender is what closes its queue, so removal from the
/// registry and channel shutdown are the same operation.
pub struct Hub {
    clients: RwLock<HashMap<ClientId, Sender<String>>>,
    next_id: AtomicU64,
    capacity: usize,
    delivery_timeout: Duration,
    stats: Arc<ServiceStats>,
}

impl Hub {
    pub fn new(capacity: usize, delivery_timeout: Duration, stats: Arc<ServiceStats>) -> Self {
        Self {
            clients: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
            delivery_timeout,
            stats,
        }
    }

    pub fn delivery_timeout(&self) -> Duration {
        self.delivery_timeout
    }

    pub fn register(&self) -> (ClientId, Receiver<String>) {
        self.register_with_capacity(self.capacity)
    }

    pub fn register_with_capacity(&self, capacity: usize) -> (ClientId, Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = channel::bounded(capacity);
        self.clients.write().insert(id, tx);
        self.stats.connections.fetch_add(1, Ordering::Relaxed);
        log::info!("client {id} connected");
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.clients.write().remove(&id).is_some();
        if removed {
            log::info!("client {id} disconnected");
        }
        removed
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.clients.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    pub fn client_ids(&self) -> Vec<ClientId> {
        let mut ids: Vec<ClientId> = self.clients.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Deliver to `origin` first, then to every other client in id order.
    /// Each recipient gets the delivery window on its own; anyone who misses
    /// it is evicted once the fan-out is done. Returns the evicted ids.
    pub fn publish(&self, origin: ClientId, message: &str) -> Vec<ClientId> {
        let mut recipients: Vec<(ClientId, Sender<String>)> = self
            .clients
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();
        recipients.sort_unstable_by_key(|(id, _)| (*id != origin, *id));

        let mut failed = Vec::new();
        for (id, tx) in recipients {
            if let Err(e) = tx.send_timeout(message.to_string(), self.delivery_timeout) {
                log::warn!("client {id} missed delivery ({e}), evicting");
                failed.push(id);
            }
        }

        if !failed.is_empty() {
            let mut clients = self.clients.write();
            for id in &failed {
                if clients.remove(id).is_some() {
                    self.stats.evictions.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        failed
    }

    /// Drop every client queue; writers see their channel close.
    pub fn close_all(&self) {
        let mut clients = self.clients.write();
        log::info!("closing {} client queues", clients.len());
        clients.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hub() -> Hub {
        Hub::new(4, Duration::from_millis(50), Arc::new(ServiceStats::default()))
    }

    #[test]
    fn origin_first_then_others() {
        let hub = hub();
        let (a, rx_a) = hub.register();
        let (b, rx_b) = hub.register();
        assert!(a < b);
        assert!(hub.publish(b, "hello").is_empty());
        assert_eq!(rx_a.try_recv().unwrap(), "hello");
        assert_eq!(rx_b.try_recv().unwrap(), "hello");
    }

    #[test]
    fn full_queue_is_evicted_and_closed() {
        let hub = hub();
        let (slow, rx_slow) = hub.register_with_capacity(1);
        let (fast, rx_fast) = hub.register();

        assert!(hub.publish(fast, "one").is_empty());
        assert_eq!(hub.publish(fast, "two"), vec![slow]);

        assert!(!hub.contains(slow));
        assert!(hub.contains(fast));
        assert_eq!(rx_fast.try_iter().collect::<Vec<_>>(), vec!["one", "two"]);
        assert_eq!(rx_slow.recv().unwrap(), "one");
        assert!(rx_slow.recv().is_err());
        assert_eq!(hub.stats.evictions.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn dropped_receiver_is_evicted() {
        let hub = hub();
        let (gone, rx) = hub.register();
        drop(rx);
        let (origin, _rx) = hub.register();
        assert_eq!(hub.publish(origin, "x"), vec![gone]);
        assert_eq!(hub.client_ids(), vec![origin]);
    }

    #[test]
    fn unregister_closes_queue() {
        let hub = hub();
        let (id, rx) = hub.register();
        assert!(hub.unregister(id));
        assert!(!hub.unregister(id));
        assert!(rx.recv().is_err());
        assert!(hub.is_empty());
    }
}
