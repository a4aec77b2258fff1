//! Durable, concurrency-safe storage for token records.
//!
//! Two implementations share the [`TokenStore`] contract:
//! - **sqlite**: the production store; atomicity comes from SQLite itself,
//!   so independent processes may share one database file
//! - **memory**: process-local, for tests and benches

pub mod memory;
pub mod sqlite;

pub use memory::MemoryTokenStore;
pub use sqlite::SqliteTokenStore;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::StoreResult;
use crate::token::{ConsumeResult, TokenId, TokenRecord};

/// Source of fresh identifiers. Swappable so collision handling can be tested.
pub type IdGenerator = Arc<dyn Fn() -> TokenId + Send + Sync>;

/// The default generator: 128 bits from the OS CSPRNG.
pub fn random_ids() -> IdGenerator {
    Arc::new(TokenId::generate)
}

/// Record counts for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Tokens ever issued
    pub total: u64,
    /// Tokens already redeemed
    pub consumed: u64,
}

/// Storage contract for token records.
///
/// Mutating operations are durable before they return `Ok`.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a new unconsumed record and return its identifier.
    ///
    /// Collisions are detected by the insert itself and retried with a
    /// fresh identifier a bounded number of times.
    async fn create(&self, payload: &str) -> StoreResult<TokenId>;

    /// Atomically mark the record consumed if it is still unused.
    ///
    /// Among concurrent callers on the same identifier exactly one observes
    /// [`ConsumeResult::Consumed`].
    async fn consume_if_unused(&self, id: &TokenId) -> StoreResult<ConsumeResult>;

    /// Non-mutating read. Never use this to decide consumption.
    async fn lookup(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>>;

    /// Record counts.
    async fn stats(&self) -> StoreResult<StoreStats>;
}
