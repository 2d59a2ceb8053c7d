use crate::clock::WallClock;
use crate::{Result, Tsn, TsnError};

/// Performs exactly one round-trip for the next value of the clock.
pub(crate) async fn issue(clock: &WallClock) -> Result<Tsn> {
    match clock.authority().next_tsn().await {
        Ok(tsn) => {
            debug!("issue tsn {} from wall clock '{}'", tsn, clock.name());
            Ok(tsn)
        }
        Err(e) => {
            error!("failed to issue tsn from wall clock '{}': {:?}", clock.name(), e);
            Err(TsnError::IssueFailed(clock.name().to_string(), e))
        }
    }
}
