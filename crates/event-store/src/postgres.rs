use async_trait::async_trait;
use common::OrderId;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    EventEnvelope, EventId, EventStoreError, Result, Version,
    store::{AppendOptions, EventStore, EventStream, validate_events_for_append},
};

const CURRENT_VERSION_SQL: &str = "SELECT MAX(version) FROM events WHERE order_id = $1";

const INSERT_EVENT_SQL: &str = "INSERT INTO events \
    (id, event_type, order_id, version, timestamp, payload) \
    VALUES ($1, $2, $3, $4, $5, $6)";

const ORDER_EVENTS_SQL: &str = "SELECT id, event_type, order_id, version, timestamp, payload \
    FROM events WHERE order_id = $1 ORDER BY version ASC";

const ALL_EVENTS_SQL: &str = "SELECT id, event_type, order_id, version, timestamp, payload \
    FROM events ORDER BY sequence ASC";

/// PostgreSQL-backed event log.
///
/// Events live in a single `events` table. Two schema details carry the
/// guarantees: the `(order_id, version)` unique constraint backstops the
/// optimistic concurrency check even for writers that skipped it, and the
/// serial `sequence` column fixes the global replay order for catch-up.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool, for callers that manage their own
    /// read-model tables.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies any pending schema migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

/// MAX(version) for one order, read inside the open transaction. Zero when
/// the order has no events yet.
async fn stored_version(tx: &mut Transaction<'_, Postgres>, order_id: &OrderId) -> Result<Version> {
    let stored: Option<i64> = sqlx::query_scalar(CURRENT_VERSION_SQL)
        .bind(order_id.as_str())
        .fetch_one(&mut **tx)
        .await?;
    Ok(Version::new(stored.unwrap_or(0)))
}

async fn insert_event(
    tx: &mut Transaction<'_, Postgres>,
    event: &EventEnvelope,
    expected: Option<Version>,
) -> Result<()> {
    sqlx::query(INSERT_EVENT_SQL)
        .bind(event.event_id.as_uuid())
        .bind(&event.event_type)
        .bind(event.order_id.as_str())
        .bind(event.version.as_i64())
        .bind(event.timestamp)
        .bind(&event.payload)
        .execute(&mut **tx)
        .await
        .map_err(|e| insert_error(e, event, expected))?;
    Ok(())
}

/// A writer that skipped the version check still trips the unique
/// constraint; surface that as a conflict rather than a raw database error.
fn insert_error(
    e: sqlx::Error,
    event: &EventEnvelope,
    expected: Option<Version>,
) -> EventStoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.constraint() == Some("unique_aggregate_version")
    {
        return EventStoreError::ConcurrencyConflict {
            order_id: event.order_id.clone(),
            expected: expected.unwrap_or_else(Version::initial),
            actual: event.version,
        };
    }
    EventStoreError::Database(e)
}

impl TryFrom<PgRow> for EventEnvelope {
    type Error = EventStoreError;

    fn try_from(row: PgRow) -> Result<Self> {
        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        validate_events_for_append(&events)
            .map_err(|e| EventStoreError::InvalidAppend(e.message))?;

        // Validation guarantees a non-empty batch over a single order.
        let order_id = events[0].order_id.clone();
        let last_version = events[events.len() - 1].version;

        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_version {
            let actual = stored_version(&mut tx, &order_id).await?;
            if actual != expected {
                // Dropping the open transaction rolls it back.
                return Err(EventStoreError::ConcurrencyConflict {
                    order_id,
                    expected,
                    actual,
                });
            }
        }

        for event in &events {
            insert_event(&mut tx, event, options.expected_version).await?;
        }

        tx.commit().await?;
        tracing::debug!(order_id = %order_id, version = %last_version, "events appended");
        Ok(last_version)
    }

    async fn events_for_order(&self, order_id: &OrderId) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(ORDER_EVENTS_SQL)
            .bind(order_id.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(EventEnvelope::try_from).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(ALL_EVENTS_SQL).fetch(&self.pool).map(|result| {
            result
                .map_err(EventStoreError::Database)
                .and_then(EventEnvelope::try_from)
        });

        Ok(Box::pin(stream))
    }

    async fn order_version(&self, order_id: &OrderId) -> Result<Option<Version>> {
        let stored: Option<i64> = sqlx::query_scalar(CURRENT_VERSION_SQL)
            .bind(order_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(stored.map(Version::new))
    }
}
