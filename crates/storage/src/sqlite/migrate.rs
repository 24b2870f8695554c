use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned schema migrations.
///
/// Version 1 creates `learning_progress`, unique per `(user_id, topic, chapter)`.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS learning_progress (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL CHECK (user_id > 0),
                    topic TEXT NOT NULL,
                    chapter TEXT NOT NULL,
                    status TEXT NOT NULL,
                    read_duration INTEGER NOT NULL DEFAULT 0 CHECK (read_duration >= 0),
                    scroll_progress INTEGER NOT NULL DEFAULT 0
                        CHECK (scroll_progress BETWEEN 0 AND 100),
                    last_position TEXT NOT NULL DEFAULT '',
                    quiz_score INTEGER NOT NULL DEFAULT 0 CHECK (quiz_score >= 0),
                    quiz_passed INTEGER NOT NULL DEFAULT 0 CHECK (quiz_passed IN (0, 1)),
                    first_visit_at TEXT NOT NULL,
                    last_visit_at TEXT NOT NULL,
                    completed_at TEXT,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, topic, chapter)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_learning_progress_user_topic
                    ON learning_progress (user_id, topic);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_learning_progress_user_last_visit
                    ON learning_progress (user_id, last_visit_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
