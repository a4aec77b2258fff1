//! SQLite-backed token store.
//!
//! Consumption is a single conditional `UPDATE ... WHERE consumed = 0`, so
//! SQLite's write lock is the serialization point. That holds across every
//! process that opens the same database file.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::{random_ids, IdGenerator, StoreStats, TokenStore};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::token::{ConsumeResult, TokenId, TokenRecord};

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tokens (
    id          TEXT PRIMARY KEY NOT NULL,
    payload     TEXT NOT NULL,
    consumed    INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    consumed_at TEXT
)
"#;

/// Row shape of the `tokens` table.
#[derive(sqlx::FromRow)]
struct TokenRow {
    id: String,
    payload: String,
    consumed: bool,
    created_at: DateTime<Utc>,
    consumed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        let id = TokenId::from_str(&row.id).map_err(|e| StoreError::Unavailable {
            operation: "lookup",
            message: format!("corrupt token id {:?}: {}", row.id, e),
        })?;
        Ok(TokenRecord {
            id,
            payload: row.payload,
            consumed: row.consumed,
            created_at: row.created_at,
            consumed_at: row.consumed_at,
        })
    }
}

/// SQLite [`TokenStore`]. Open once at startup and share by reference.
pub struct SqliteTokenStore {
    pool: Pool<Sqlite>,
    id_generator: IdGenerator,
    max_id_attempts: u32,
    operation_timeout: Duration,
}

impl SqliteTokenStore {
    /// Open (creating if needed) the database at `path`.
    pub async fn open(path: &Path, config: &StoreConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable {
                operation: "open",
                message: format!("cannot create {}: {}", parent.display(), e),
            })?;
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Acknowledged writes must survive a crash
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_millis(config.busy_timeout_ms));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_millis(config.operation_timeout_ms))
            .connect_with(opts)
            .await
            .map_err(|e| unavailable("open", e))?;

        tracing::debug!(path = %path.display(), "Opened token store");
        Self::from_pool(pool, config).await
    }

    /// Open a private in-memory database. Contents vanish with the handle.
    pub async fn open_in_memory(config: &StoreConfig) -> StoreResult<Self> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| unavailable("open", e))?;

        // Every connection to :memory: is a separate database, so pin one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await
            .map_err(|e| unavailable("open", e))?;

        Self::from_pool(pool, config).await
    }

    async fn from_pool(pool: Pool<Sqlite>, config: &StoreConfig) -> StoreResult<Self> {
        let store = Self {
            pool,
            id_generator: random_ids(),
            max_id_attempts: config.max_id_attempts,
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Replace the identifier source.
    pub fn with_id_generator(mut self, id_generator: IdGenerator) -> Self {
        self.id_generator = id_generator;
        self
    }

    /// Close every pooled connection. Later operations report `Unavailable`.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn migrate(&self) -> StoreResult<()> {
        sqlx::query(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;
        Ok(())
    }

    /// Bound a query by the operation timeout, leaving driver errors to the caller.
    async fn timed<T, F>(
        &self,
        operation: &'static str,
        query: F,
    ) -> StoreResult<Result<T, sqlx::Error>>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        tokio::time::timeout(self.operation_timeout, query)
            .await
            .map_err(|_| StoreError::Timeout {
                operation,
                timeout_ms: self.operation_timeout.as_millis() as u64,
            })
    }
}

fn unavailable(operation: &'static str, err: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        operation,
        message: err.to_string(),
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn create(&self, payload: &str) -> StoreResult<TokenId> {
        for attempt in 1..=self.max_id_attempts {
            let id = (self.id_generator)();
            let insert = sqlx::query(
                "INSERT INTO tokens (id, payload, consumed, created_at) VALUES (?, ?, 0, ?)",
            )
            .bind(id.as_str())
            .bind(payload)
            .bind(Utc::now())
            .execute(&self.pool);

            match self.timed("create", insert).await? {
                Ok(_) => return Ok(id),
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    tracing::warn!(attempt, "Token identifier collision, regenerating");
                }
                Err(e) => return Err(unavailable("create", e)),
            }
        }
        Err(StoreError::IdentifierExhausted {
            attempts: self.max_id_attempts,
        })
    }

    async fn consume_if_unused(&self, id: &TokenId) -> StoreResult<ConsumeResult> {
        let update = sqlx::query_scalar::<_, String>(
            "UPDATE tokens SET consumed = 1, consumed_at = ? \
             WHERE id = ? AND consumed = 0 \
             RETURNING payload",
        )
        .bind(Utc::now())
        .bind(id.as_str())
        .fetch_optional(&self.pool);

        let claimed = self
            .timed("consume", update)
            .await?
            .map_err(|e| unavailable("consume", e))?;
        if let Some(payload) = claimed {
            return Ok(ConsumeResult::Consumed(payload));
        }

        // Lost the race or never existed. `consumed` never reverts and rows are
        // never deleted, so existence alone decides which.
        let probe = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tokens WHERE id = ?")
            .bind(id.as_str())
            .fetch_one(&self.pool);
        let count = self
            .timed("consume", probe)
            .await?
            .map_err(|e| unavailable("consume", e))?;

        Ok(if count > 0 {
            ConsumeResult::AlreadyConsumed
        } else {
            ConsumeResult::NotFound
        })
    }

    async fn lookup(&self, id: &TokenId) -> StoreResult<Option<TokenRecord>> {
        let select = sqlx::query_as::<_, TokenRow>(
            "SELECT id, payload, consumed, created_at, consumed_at FROM tokens WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool);

        self.timed("lookup", select)
            .await?
            .map_err(|e| unavailable("lookup", e))?
            .map(TokenRecord::try_from)
            .transpose()
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let select = sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*), COALESCE(SUM(consumed), 0) FROM tokens",
        )
        .fetch_one(&self.pool);

        let (total, consumed) = self
            .timed("stats", select)
            .await?
            .map_err(|e| unavailable("stats", e))?;
        Ok(StoreStats {
            total: total as u64,
            consumed: consumed as u64,
        })
    }
}
