use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::authority::Authority;
use crate::name::ClockName;
use crate::{boundary, issuer, Result, Tsn, TsnError};

/// Anchors the live authority of one wall clock.
///
/// Handles are created and published by a [`ClockRegistry`](crate::ClockRegistry),
/// which keeps at most one of them per name.
pub struct WallClock {
    name: ClockName,
    target: String,
    authority: Arc<dyn Authority>,
}

impl WallClock {
    pub(crate) fn new(name: ClockName, target: String, authority: Arc<dyn Authority>) -> Self {
        Self {
            name,
            target,
            authority,
        }
    }

    pub fn name(&self) -> &ClockName {
        &self.name
    }

    /// The connection target derived from the template. It may carry credentials.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn authority(&self) -> &dyn Authority {
        &*self.authority
    }

    /// Returns true if both handles are backed by the very same authority.
    pub fn same_authority(&self, other: &WallClock) -> bool {
        Arc::as_ptr(&self.authority).cast::<()>() == Arc::as_ptr(&other.authority).cast::<()>()
    }

    /// Retrieves the next TSN of this clock.
    ///
    /// Every call is a fresh round-trip to the authority and failures are
    /// never retried: the value may or may not have been consumed.
    pub async fn new_tsn(&self) -> Result<Tsn> {
        boundary::contain(issuer::issue(self), || {
            TsnError::TsnUnavailable(self.name.to_string())
        })
        .await
    }
}

impl Debug for WallClock {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WallClock")
            .field("name", &self.name)
            .field("authority", &self.authority.id())
            .finish()
    }
}
