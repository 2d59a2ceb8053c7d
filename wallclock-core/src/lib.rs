#![allow(clippy::type_complexity)]
#![allow(clippy::module_inception)]
#![allow(clippy::upper_case_acronyms)]
#![doc(test(
    no_crate_inject,
    attr(deny(warnings, rust_2018_idioms), allow(dead_code, unused_variables))
))]

//! Transaction sequence numbers (TSNs) issued by named wall clocks.
//!
//! Each wall clock is backed by an external monotonic counter, by default a
//! PostgreSQL sequence living in the database named after the clock:
//!
//! ```no_run
//! # async fn run() -> wallclock_core::Result<()> {
//! let clock = wallclock_core::obtain_clock("rainer").await?;
//! let tsn = clock.new_tsn().await?;
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

pub use boundary::{default_registry, install_default_registry, obtain_clock};
pub use clock::WallClock;
pub use error::TsnError;
pub use name::{ClockName, Template};
pub use registry::ClockRegistry;

pub type Result<T> = std::result::Result<T, TsnError>;

/// A transaction sequence number, only comparable within one clock.
pub type Tsn = i64;

pub mod authority;
mod boundary;
mod clock;
mod error;
mod issuer;
mod name;
mod registry;
