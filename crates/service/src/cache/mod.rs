//! Local durable cache: small key-value text storage that survives restarts.
//!
//! Holds the last version token, a fallback copy of the snapshot, the
//! device's user id and, for OAuth sessions, the signed-in token.

pub mod file;
pub mod memory;

use async_trait::async_trait;

use crate::errors::ServiceError;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Last-known remote version token.
pub const VERSION_TOKEN_KEY: &str = "dataSHA";
/// Fallback copy of the snapshot (compact JSON).
pub const SNAPSHOT_KEY: &str = "cachedBusinesses";
/// Identity generated for this device.
pub const USER_ID_KEY: &str = "userId";
/// Token stored by an OAuth sign-in.
pub const OAUTH_TOKEN_KEY: &str = "oauthToken";

/// Trait abstraction for the local cache.
/// Implementations can be file-backed or in-memory.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String) -> Result<(), ServiceError>;
    async fn remove(&self, key: &str) -> Result<bool, ServiceError>;
}
