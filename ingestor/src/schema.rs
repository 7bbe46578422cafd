//! Idempotent creation of the readings table and its indexes.

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::errors::Result;

pub const READINGS_TABLE: &str = "sensor_readings";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS sensor_readings (
        id          BIGSERIAL PRIMARY KEY,
        device_id   VARCHAR(255) NOT NULL,
        device_name VARCHAR(255) NOT NULL,
        value       TEXT NOT NULL,
        observed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_TOUCH_FUNCTION: &str = r#"
    CREATE OR REPLACE FUNCTION sensor_readings_touch_updated_at() RETURNS trigger AS $$
    BEGIN
        NEW.updated_at = now();
        RETURN NEW;
    END;
    $$ LANGUAGE plpgsql
"#;

const DROP_TOUCH_TRIGGER: &str =
    "DROP TRIGGER IF EXISTS sensor_readings_touch_updated_at ON sensor_readings";

const CREATE_TOUCH_TRIGGER: &str = r#"
    CREATE TRIGGER sensor_readings_touch_updated_at
        BEFORE UPDATE ON sensor_readings
        FOR EACH ROW EXECUTE FUNCTION sensor_readings_touch_updated_at()
"#;

/// Supporting indexes: device lookups, time scans, the history/filter
/// access path, and retention scans.
pub const INDEXES: [(&str, &str); 4] = [
    (
        "idx_readings_device_id",
        "CREATE INDEX IF NOT EXISTS idx_readings_device_id ON sensor_readings (device_id)",
    ),
    (
        "idx_readings_observed_at",
        "CREATE INDEX IF NOT EXISTS idx_readings_observed_at ON sensor_readings (observed_at)",
    ),
    (
        "idx_readings_device_observed",
        "CREATE INDEX IF NOT EXISTS idx_readings_device_observed ON sensor_readings (device_id, observed_at DESC)",
    ),
    (
        "idx_readings_created_at",
        "CREATE INDEX IF NOT EXISTS idx_readings_created_at ON sensor_readings (created_at)",
    ),
];

/// Creates the table, its `updated_at` trigger, and the supporting indexes.
///
/// Table and trigger failures are fatal. A missing index only costs
/// performance, so index failures are logged and startup continues.
pub async fn initialize(pool: &PgPool) -> Result<()> {
    info!("Initializing schema for {}", READINGS_TABLE);

    match sqlx::query(CREATE_TABLE).execute(pool).await {
        Err(e) if is_already_exists(&e) => debug!("{} created concurrently", READINGS_TABLE),
        other => {
            other?;
        }
    }

    // DROP + CREATE keeps this rerunnable on servers without CREATE OR REPLACE TRIGGER.
    let mut tx = pool.begin().await?;
    sqlx::query(CREATE_TOUCH_FUNCTION).execute(&mut *tx).await?;
    sqlx::query(DROP_TOUCH_TRIGGER).execute(&mut *tx).await?;
    sqlx::query(CREATE_TOUCH_TRIGGER).execute(&mut *tx).await?;
    tx.commit().await?;

    let mut created = 0;
    for (name, ddl) in INDEXES {
        match sqlx::query(ddl).execute(pool).await {
            Ok(_) => created += 1,
            Err(e) if is_already_exists(&e) => {
                debug!("Index {} already exists", name);
                created += 1;
            }
            Err(e) => warn!("Index creation warning for {}: {}", name, e),
        }
    }

    info!(
        "Schema initialized ({}/{} indexes present)",
        created,
        INDEXES.len()
    );
    Ok(())
}

/// `IF NOT EXISTS` can still race with a concurrent creator: Postgres then
/// reports duplicate_table or a unique violation on its catalog.
fn is_already_exists(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .is_some_and(|code| code == "42P07" || code == "23505"),
        _ => false,
    }
}
