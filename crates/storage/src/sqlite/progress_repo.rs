use chrono::Utc;
use learn_core::model::{LearningProgress, UserId};

use super::{
    SqliteRepository,
    mapping::{map_progress_row, read_duration_to_i64, user_id_to_i64},
};
use crate::repository::{ProgressRepository, StorageError};

const SELECT_COLUMNS: &str = r"
    SELECT
        user_id, topic, chapter, status, read_duration, scroll_progress,
        last_position, quiz_score, quiz_passed, first_visit_at, last_visit_at,
        completed_at
    FROM learning_progress
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get(
        &self,
        user_id: UserId,
        topic: &str,
        chapter: &str,
    ) -> Result<Option<LearningProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 AND topic = ?2 AND chapter = ?3");
        let row = sqlx::query(&sql)
            .bind(user_id_to_i64(user_id)?)
            .bind(topic)
            .bind(chapter)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<LearningProgress>, StorageError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY last_visit_at DESC, topic ASC, chapter ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id_to_i64(user_id)?)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn list_by_topic(
        &self,
        user_id: UserId,
        topic: &str,
    ) -> Result<Vec<LearningProgress>, StorageError> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE user_id = ?1 AND topic = ?2 ORDER BY last_visit_at DESC, chapter ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id_to_i64(user_id)?)
            .bind(topic)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn upsert(&self, progress: &LearningProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO learning_progress (
                user_id, topic, chapter, status, read_duration, scroll_progress,
                last_position, quiz_score, quiz_passed, first_visit_at, last_visit_at,
                completed_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(user_id, topic, chapter) DO UPDATE SET
                -- keep first_visit_at from the original insert; only update mutable fields
                status = excluded.status,
                read_duration = excluded.read_duration,
                scroll_progress = excluded.scroll_progress,
                last_position = excluded.last_position,
                quiz_score = excluded.quiz_score,
                quiz_passed = excluded.quiz_passed,
                last_visit_at = excluded.last_visit_at,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(user_id_to_i64(progress.user_id)?)
        .bind(progress.topic.as_str())
        .bind(progress.chapter.as_str())
        .bind(progress.status.as_str())
        .bind(read_duration_to_i64(progress.read_duration)?)
        .bind(i64::from(progress.scroll_progress))
        .bind(progress.last_position.as_str())
        .bind(i64::from(progress.quiz_score))
        .bind(progress.quiz_passed)
        .bind(progress.first_visit_at)
        .bind(progress.last_visit_at)
        .bind(progress.completed_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
