use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use once_cell::sync::OnceCell;

use wallclock_etc::ClockConfig;

use crate::clock::WallClock;
use crate::registry::ClockRegistry;
use crate::{Result, TsnError};

static DEFAULT_REGISTRY: OnceCell<ClockRegistry> = OnceCell::new();

/// Returns the process-wide registry, built from `WALLCLOCK_DB` on first use
/// unless one was installed before.
///
/// A configuration failure is not memorized: a later call tries again.
pub fn default_registry() -> Result<&'static ClockRegistry> {
    DEFAULT_REGISTRY.get_or_try_init(|| -> Result<ClockRegistry> {
        let c = ClockConfig::from_env();
        c.validate()?;
        let registry = ClockRegistry::from_config(&c)?;
        info!("initialize default wall clock registry");
        Ok(registry)
    })
}

/// Installs the process-wide registry, which fails if one is already in use.
pub fn install_default_registry(registry: ClockRegistry) -> std::result::Result<(), ClockRegistry> {
    DEFAULT_REGISTRY.set(registry)
}

/// Gets the wall clock of the given name from the process-wide registry.
pub async fn obtain_clock(name: &str) -> Result<Arc<WallClock>> {
    default_registry()?.obtain(name).await
}

/// Runs `fut` and turns a panic inside it into the error built by `fallback`.
pub(crate) async fn contain<F, T, E>(fut: F, fallback: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce() -> TsnError,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            let e = fallback();
            error!("{}: {}", e, panic_message(&*panic));
            Err(e)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        return s;
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s;
    }
    "unknown panic"
}
