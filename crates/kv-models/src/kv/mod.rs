pub mod memory;

pub use memory::MemoryKv;

use async_trait::async_trait;
use thiserror::Error;

pub type KvResult<T> = Result<T, KvError>;

/// Errors surfaced by a key-value client.
///
/// The core treats any of these as a hard failure of the enclosing
/// save/destroy/list call; retry policy is a caller concern.
#[derive(Debug, Error)]
pub enum KvError {
    /// Transport failure or timeout talking to the store.
    #[error("key-value store unavailable: {0}")]
    Unavailable(String),
    /// The store rejected the command (wrong type for key, protocol error).
    #[error("key-value command failed: {0}")]
    Command(String),
}

/// Narrow interface over the shared key-value store connection.
///
/// Mirrors the primitive per-key command set the index layer relies on:
/// plain strings, sets, and sorted sets. No transactions span multiple keys;
/// correctness relies on store-level atomicity per individual command only.
/// Implementations must be cheap to clone/share (`Arc`) and thread-safe.
#[async_trait]
pub trait KvClient: Send + Sync {
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> KvResult<()>;

    /// Set only if the key is absent. Returns true when the write claimed the
    /// key, false when another value was already present (SETNX-equivalent).
    async fn set_nx(&self, key: &str, value: &str) -> KvResult<bool>;

    /// Delete a key. Idempotent: deleting an absent key is Ok.
    async fn del(&self, key: &str) -> KvResult<()>;

    async fn sadd(&self, key: &str, member: &str) -> KvResult<()>;

    /// Remove a member from a set. Idempotent if absent.
    async fn srem(&self, key: &str, member: &str) -> KvResult<()>;

    /// Members of a set; an absent key reads as the empty set.
    async fn smembers(&self, key: &str) -> KvResult<Vec<String>>;

    /// Add a member with a score, replacing any previous score.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> KvResult<()>;

    /// Remove a member from a sorted set. Idempotent if absent.
    async fn zrem(&self, key: &str, member: &str) -> KvResult<()>;

    /// Read members in score order, ascending unless `reverse`, skipping
    /// `offset` members and returning at most `limit` when given.
    async fn zrange(
        &self,
        key: &str,
        offset: usize,
        limit: Option<usize>,
        reverse: bool,
    ) -> KvResult<Vec<String>>;
}
