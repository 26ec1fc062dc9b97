//! Sync core for the shared business-name list.
//! - `remote` reads and writes the shared JSON document with optimistic versioning.
//! - `registry` holds the in-memory list and persists every mutation.
//! - `cache`, `credentials` and `identity` hold per-device state.

pub mod app;
pub mod cache;
pub mod credentials;
pub mod errors;
pub mod events;
pub mod identity;
pub mod observability;
pub mod registry;
pub mod remote;
pub mod storage;
pub mod sync;

pub use app::App;
pub use errors::ServiceError;
pub use events::{Notice, Phase, RegistryEvent};
