//! Database Module
//!
//! Handles database connection, migrations, and schema management.

use sqlx::SqlitePool;

/// Migration files embedded at compile time
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "000_migrations_table",
        include_str!("migrations/000_migrations_table.sql"),
    ),
    (
        "001_create_learners",
        include_str!("migrations/001_create_learners.sql"),
    ),
    (
        "002_create_items",
        include_str!("migrations/002_create_items.sql"),
    ),
    (
        "003_create_memory_states",
        include_str!("migrations/003_create_memory_states.sql"),
    ),
    (
        "004_create_review_log",
        include_str!("migrations/004_create_review_log.sql"),
    ),
    (
        "005_create_placement_sessions",
        include_str!("migrations/005_create_placement_sessions.sql"),
    ),
];

/// Run all pending database migrations
pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    tracing::info!("Running database migrations...");

    let (_, migrations_sql) = MIGRATIONS[0];
    sqlx::query(migrations_sql).execute(pool).await?;

    let applied: Vec<String> = sqlx::query_scalar("SELECT name FROM _migrations")
        .fetch_all(pool)
        .await
        .unwrap_or_default();

    let mut applied_count = 0;
    for (name, sql) in MIGRATIONS.iter().skip(1) {
        if applied.contains(&name.to_string()) {
            tracing::debug!("Migration {} already applied, skipping", name);
            continue;
        }

        tracing::info!("Applying migration: {}", name);

        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement).execute(pool).await?;
        }

        sqlx::query("INSERT INTO _migrations (name) VALUES (?)")
            .bind(*name)
            .execute(pool)
            .await?;

        applied_count += 1;
    }

    if applied_count > 0 {
        tracing::info!("Applied {} new migration(s)", applied_count);
    } else {
        tracing::info!("Database schema is up to date");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();

        let result = migrate(&pool).await;
        assert!(result.is_ok());

        let result = migrate(&pool).await;
        assert!(result.is_ok());

        for table in ["learners", "items", "memory_states", "review_log", "placement_sessions"] {
            let exists: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?")
                    .bind(table)
                    .fetch_optional(&pool)
                    .await
                    .unwrap();
            assert!(exists.is_some(), "table {} should exist", table);
        }
    }
}
