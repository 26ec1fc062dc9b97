//! Business registry: the in-memory list and its mutations.
//!
//! - `state::Registry` applies commands to a snapshot and says whether the
//!   result must be written (`PersistIntent`). No I/O.
//! - `service::BusinessRegistry` owns a `Registry`, pushes through the
//!   `RemoteStore` and reports to subscribers.

pub mod service;
pub mod state;

pub use service::{Applied, BusinessRegistry, Persistence};
pub use state::{Outcome, PersistIntent, Registry};
