use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;

use crate::Tsn;

use super::{Authority, Connector};

#[derive(Default)]
struct Shared {
    connects: AtomicUsize,
    closes: AtomicUsize,
    unreachable: AtomicBool,
    panicking: AtomicBool,
    // one counter per connection target, like one sequence per database
    counters: Mutex<HashMap<String, Arc<AtomicI64>>>,
}

/// An in-process counter authority.
///
/// Every connection gets a distinct id, and the connector keeps track of how
/// many authorities were opened and closed so callers can verify that no
/// connection leaks.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    shared: Arc<Shared>,
    delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Default::default()
    }

    /// Makes every connect wait for `delay` before returning.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay.replace(delay);
        self
    }

    /// Toggles whether new connections and liveness probes fail.
    pub fn set_reachable(&self, reachable: bool) {
        self.shared.unreachable.store(!reachable, Ordering::SeqCst);
    }

    /// Toggles whether connecting and issuing panic instead of failing.
    pub fn set_panicking(&self, panicking: bool) {
        self.shared.panicking.store(panicking, Ordering::SeqCst);
    }

    /// Number of authorities opened so far.
    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    /// Number of authorities closed so far.
    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    /// Number of authorities opened and not closed yet.
    pub fn live(&self) -> usize {
        // closes never outrun connects when loaded first
        let closes = self.closes();
        self.connects().saturating_sub(closes)
    }

    fn counter(&self, target: &str) -> Arc<AtomicI64> {
        let mut w = self.shared.counters.lock();
        let counter = w.entry_ref(target).or_insert_with(Default::default);
        Arc::clone(counter)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, target: &str) -> Result<Arc<dyn Authority>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.shared.panicking.load(Ordering::SeqCst) {
            panic!("memory authority '{}' exploded", target);
        }
        if self.shared.unreachable.load(Ordering::SeqCst) {
            bail!("memory authority '{}' is unreachable", target);
        }

        let id = super::next_id();
        self.shared.connects.fetch_add(1, Ordering::SeqCst);

        debug!("open memory authority #{}", id);

        Ok(Arc::new(MemoryAuthority {
            id,
            counter: self.counter(target),
            closed: AtomicBool::new(false),
            shared: Clone::clone(&self.shared),
        }))
    }
}

pub struct MemoryAuthority {
    id: u64,
    counter: Arc<AtomicI64>,
    closed: AtomicBool,
    shared: Arc<Shared>,
}

impl MemoryAuthority {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Authority for MemoryAuthority {
    fn id(&self) -> u64 {
        self.id
    }

    async fn ping(&self) -> Result<()> {
        if self.is_closed() {
            bail!("memory authority #{} is closed", self.id);
        }
        if self.shared.unreachable.load(Ordering::SeqCst) {
            bail!("memory authority #{} is unreachable", self.id);
        }
        Ok(())
    }

    async fn next_tsn(&self) -> Result<Tsn> {
        if self.shared.panicking.load(Ordering::SeqCst) {
            panic!("memory authority #{} exploded", self.id);
        }
        if self.is_closed() {
            bail!("memory authority #{} is closed", self.id);
        }
        if self.shared.unreachable.load(Ordering::SeqCst) {
            bail!("memory authority #{} is unreachable", self.id);
        }
        Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            debug!("close memory authority #{}", self.id);
        }
    }
}
