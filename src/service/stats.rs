use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ServiceStats {
    pub connections: AtomicU64,
    pub queries: AtomicU64,
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub malformed: AtomicU64,
    pub evictions: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub connections: u64,
    pub queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub malformed: u64,
    pub evictions: u64,
}

impl ServiceStats {
    pub fn record_pick(&self, hit: bool) {
        self.queries.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections: self.connections.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
