use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

pub use memory::{MemoryAuthority, MemoryConnector};
pub use postgres::{PostgresAuthority, PostgresConnector, CLOCK_SCHEMA};

use crate::Tsn;

pub mod memory;
pub mod postgres;

static AUTHORITY_SEQ: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique id for a newly opened authority.
pub(crate) fn next_id() -> u64 {
    AUTHORITY_SEQ.fetch_add(1, Ordering::Relaxed)
}

/// A live, reusable connection to a monotonic counter.
///
/// Implementations must be safe for concurrent use: a published clock shares
/// one authority between every caller.
#[async_trait]
pub trait Authority: Send + Sync + 'static {
    /// Process-unique id of this authority, useful to tell connections apart.
    fn id(&self) -> u64;

    /// Cheap round-trip which validates reachability and authentication.
    async fn ping(&self) -> Result<()>;

    /// Fetches the next value of the counter, exactly one round-trip.
    async fn next_tsn(&self) -> Result<Tsn>;

    /// Releases the underlying connections. Further calls will fail.
    fn close(&self);
}

/// Opens authorities from a concrete connection target.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, target: &str) -> Result<Arc<dyn Authority>>;
}
