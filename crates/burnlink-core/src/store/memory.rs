//! Process-local token store.
//!
//! Check-and-mark happens under a single lock acquisition, which is enough
//! for callers inside one process. It does not coordinate across processes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{random_ids, IdGenerator, StoreStats, TokenStore};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::token::{ConsumeResult, TokenId, TokenRecord};

/// In-memory [`TokenStore`].
pub struct MemoryTokenStore {
    records: Mutex<HashMap<TokenId, TokenRecord>>,
    id_generator: IdGenerator,
    max_id_attempts: u32,
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTokenStore {
    /// Create an empty store with the default store settings.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    /// Create an empty store honoring `store.max_id_attempts`.
    ///
    /// Connection and timeout settings have no meaning in memory.
    pub fn with_config(config: &StoreConfig) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            id_generator: random_ids(),
            max_id_attempts: config.max_id_attempts,
        }
    }

    /// Replace the identifier source.
    pub fn with_id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    fn records(
        &self,
        operation: &'static str,
    ) -> StoreResult<MutexGuard<'_, HashMap<TokenId, TokenRecord>>> {
        self.records.lock().map_err(|_| StoreError::Unavailable {
            operation,
            message: "store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn create(&self, payload: &str) -> StoreResult<TokenId> {
        let mut records = self.records("create")?;
        for attempt in 1..=self.max_id_attempts {
            let id = (self.id_generator)();
            match records.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(TokenRecord::new(id.clone(), payload));
                    return Ok(id);
                }
                Entry::Occupied(_) => {
                    tracing::warn!(attempt, "Token identifier collision, regenerating");
                }
            }
        }
        Err(StoreError::IdentifierExhausted {
            attempts: self.max_id_attempts,
        })
    }

    async fn consume_if_unused(&self, id: &TokenId) -> StoreResult<ConsumeResult> {
        let mut records = self.records("consume")?;
        let Some(record) = records.get_mut(id) else {
            return Ok(ConsumeResult::NotFound);
        };
        if record.consumed {
            return Ok(ConsumeResult::AlreadyConsumed);
        }
        record.consumed = true;
        record.consumed_at = Some(Utc::now());
        Ok(ConsumeResult::Consumed(record.payload.clone()))
    }

    async fn lookup(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        Ok(self.records("lookup")?.get(id).cloned())
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let records = self.records("stats")?;
        Ok(StoreStats {
            total: records.len() as u64,
            consumed: records.values().filter(|r| r.consumed).count() as u64,
        })
    }
}
