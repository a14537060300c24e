use sqlx::{Executor, SqlitePool};

use crate::error::DbError;

const MIGRATIONS: &[(i64, &str, &str)] = &[
    (
        1,
        "initial_schema",
        include_str!("../../migrations/001_initial_schema.sql"),
    ),
    (
        2,
        "reference_data",
        include_str!("../../migrations/002_reference_data.sql"),
    ),
];

/// Run all pending migrations in order
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
    init_migrations_tracker(pool).await?;
    let current = current_version(pool).await?;

    for (version, name, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        tracing::info!("Running migration v{} ({})", version, name);

        let mut tx = pool.begin().await?;
        (&mut *tx).execute(*sql).await.map_err(|e| DbError::Migration {
            version: *version,
            reason: e.to_string(),
        })?;
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(*version)
            .bind(*name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
    }

    Ok(())
}

/// Create the table that tracks applied migrations
async fn init_migrations_tracker(pool: &SqlitePool) -> Result<(), DbError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64, DbError> {
    let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await?;
    Ok(version.unwrap_or(0))
}
