use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use tokio::sync::OnceCell;

use orders_api::{OrderRecord, OrderStore, RecordStream, StoreError};

use crate::config::PgStoreConfig;

const SQL_CREATE: &str = include_str!("../sql/create_orders.sql");

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn corrupt(e: sqlx::Error) -> StoreError {
    StoreError::Corrupt(e.to_string())
}

/// Тексты запросов с подставленным именем таблицы.
struct Statements {
    create: String,
    upsert: String,
    get: String,
    recent: String,
}

impl Statements {
    fn new(table: &str) -> Self {
        Self {
            create: SQL_CREATE.replace("{table}", table),
            // created_at не обновляется: время создания сохраняется при replace.
            upsert: format!(
                "INSERT INTO {table} (id, payload) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET payload = EXCLUDED.payload"
            ),
            get: format!("SELECT id, payload, created_at FROM {table} WHERE id = $1"),
            recent: format!(
                "SELECT id, payload, created_at FROM {table} \
                 ORDER BY created_at DESC, id DESC LIMIT $1"
            ),
        }
    }
}

// ════════════════════════════════════════════════════════════════
//  PgOrderStore
// ════════════════════════════════════════════════════════════════

/// Postgres OrderStore.
///
/// Payload хранится в `BYTEA` и возвращается побайтно тем же, что был
/// записан. Пул создаётся лениво: недоступная база не мешает старту,
/// операции просто возвращают `StoreError::Unavailable`. Схема создаётся
/// при первой успешной операции (`CREATE ... IF NOT EXISTS`).
pub struct PgOrderStore {
    pool: PgPool,
    table: String,
    sql: Statements,
    schema: OnceCell<()>,
}

impl PgOrderStore {
    pub fn connect_lazy(config: &PgStoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Config(format!("postgres url: {e}")))?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);
        Ok(Self::with_pool(pool, &config.table))
    }

    pub fn with_pool(pool: PgPool, table: &str) -> Self {
        Self {
            pool,
            table: table.to_string(),
            sql: Statements::new(table),
            schema: OnceCell::new(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::raw_sql(&self.sql.create)
                    .execute(&self.pool)
                    .await
                    .map_err(unavailable)?;
                tracing::info!(table = %self.table, "orders schema ready");
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    fn fetch_recent(&self, limit: usize) -> RecordStream<'_> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        sqlx::query(&self.sql.recent)
            .bind(limit)
            .fetch(&self.pool)
            .map(|row| row.map_err(unavailable).and_then(|row| decode_row(&row)))
            .boxed()
    }
}

fn decode_row(row: &PgRow) -> Result<OrderRecord, StoreError> {
    let id: String = row.try_get("id").map_err(corrupt)?;
    let payload: Vec<u8> = row.try_get("payload").map_err(corrupt)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(corrupt)?;
    Ok(OrderRecord::new(id, Bytes::from(payload), created_at))
}

impl OrderStore for PgOrderStore {
    fn init(&self) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        Box::pin(self.ensure_schema())
    }

    fn upsert(
        &self,
        id: &str,
        payload: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + '_>> {
        let id = id.to_owned();
        Box::pin(async move {
            self.ensure_schema().await?;
            sqlx::query(&self.sql.upsert)
                .bind(&id)
                .bind(payload.as_ref())
                .execute(&self.pool)
                .await
                .map_err(unavailable)?;
            Ok(())
        })
    }

    fn get(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<OrderRecord>, StoreError>> + Send + '_>> {
        let id = id.to_owned();
        Box::pin(async move {
            self.ensure_schema().await?;
            let row = sqlx::query(&self.sql.get)
                .bind(&id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;
            row.as_ref().map(decode_row).transpose()
        })
    }

    fn load_recent(&self, limit: usize) -> RecordStream<'_> {
        futures::stream::once(self.ensure_schema())
            .map_ok(move |()| self.fetch_recent(limit))
            .try_flatten()
            .boxed()
    }
}
