use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use std::time::Duration;
use tracing::{info, warn};

use crate::errors::{Error, Result};
use crate::model::{ClassifiedReading, Reading, Status};
use crate::store::StoreBackend;

pub async fn make_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Postgres backend: a single-row `current_snapshot` slot plus the
/// append-only `history` table.
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exec_set_current(&self, r: &ClassifiedReading) -> Result<()> {
        sqlx::query(
            "INSERT INTO current_snapshot (slot, smoke, temperature, humidity, status, ts)
             VALUES (1, $1, $2, $3, $4, $5)
             ON CONFLICT (slot) DO UPDATE
             SET smoke = EXCLUDED.smoke,
                 temperature = EXCLUDED.temperature,
                 humidity = EXCLUDED.humidity,
                 status = EXCLUDED.status,
                 ts = EXCLUDED.ts",
        )
        .bind(r.reading.smoke)
        .bind(r.reading.temperature)
        .bind(r.reading.humidity)
        .bind(r.status.as_str())
        .bind(r.reading.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl StoreBackend for PgBackend {
    async fn set_current(&self, reading: ClassifiedReading) -> Result<()> {
        // Idempotent overwrite: safe to retry once on a transient failure.
        match self.exec_set_current(&reading).await {
            Err(Error::Database(ref e)) if is_transient_error(e) => {
                warn!("current-slot write failed, retrying once: {}", e);
                self.exec_set_current(&reading).await
            }
            other => other,
        }
    }

    async fn get_current(&self) -> Result<Option<ClassifiedReading>> {
        let row = sqlx::query_as::<_, SampleRow>(
            "SELECT smoke, temperature, humidity, status, ts
             FROM current_snapshot WHERE slot = 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        row.map(ClassifiedReading::try_from).transpose()
    }

    async fn append_history(&self, reading: ClassifiedReading) -> Result<()> {
        // No retry here: history has no natural key, so a retried insert
        // could land twice.
        sqlx::query(
            "INSERT INTO history (smoke, temperature, humidity, status, ts)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(reading.reading.smoke)
        .bind(reading.reading.temperature)
        .bind(reading.reading.humidity)
        .bind(reading.status.as_str())
        .bind(reading.reading.timestamp)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_n(&self, limit: usize) -> Result<Vec<ClassifiedReading>> {
        let rows = sqlx::query_as::<_, SampleRow>(
            "SELECT smoke, temperature, humidity, status, ts
             FROM history
             ORDER BY ts DESC, id DESC
             LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ClassifiedReading::try_from).collect()
    }

    async fn delete_history(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn delete_history_older_than(&self, cutoff: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM history WHERE ts <= $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(FromRow)]
struct SampleRow {
    smoke: i64,
    temperature: f64,
    humidity: f64,
    status: String,
    ts: i64,
}

impl TryFrom<SampleRow> for ClassifiedReading {
    type Error = Error;

    fn try_from(row: SampleRow) -> Result<ClassifiedReading> {
        let status = Status::parse(&row.status).ok_or_else(|| {
            Error::Validation(format!("unknown status {:?} in store", row.status))
        })?;
        Ok(ClassifiedReading {
            reading: Reading {
                smoke: row.smoke,
                temperature: row.temperature,
                humidity: row.humidity,
                timestamp: row.ts,
            },
            status,
        })
    }
}

fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed => true,
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| {
            code == "08000" || // connection_exception
            code == "08003" || // connection_does_not_exist
            code == "08006" || // connection_failure
            code == "57P03" || // cannot_connect_now
            code == "53300" // too_many_connections
        }),
        _ => false,
    }
}
