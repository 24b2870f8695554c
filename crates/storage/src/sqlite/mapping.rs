use learn_core::model::{ChapterStatus, LearningProgress, UserId};
use sqlx::Row;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_to_i64(user_id: UserId) -> Result<i64, StorageError> {
    i64::try_from(user_id.value())
        .map_err(|_| StorageError::Serialization("user_id overflow".into()))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    u64::try_from(v)
        .map(UserId::new)
        .map_err(|_| StorageError::Serialization("user_id sign overflow".into()))
}

pub(crate) fn read_duration_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("read_duration overflow".into()))
}

pub(crate) fn parse_status(s: &str) -> Result<ChapterStatus, StorageError> {
    s.parse::<ChapterStatus>().map_err(ser)
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LearningProgress, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;

    let read_duration_i64: i64 = row.try_get("read_duration").map_err(ser)?;
    let read_duration = u64::try_from(read_duration_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid read_duration: {read_duration_i64}"))
    })?;

    let scroll_i64: i64 = row.try_get("scroll_progress").map_err(ser)?;
    let scroll_progress = u8::try_from(scroll_i64)
        .ok()
        .filter(|v| *v <= 100)
        .ok_or_else(|| StorageError::Serialization(format!("invalid scroll_progress: {scroll_i64}")))?;

    let quiz_score_i64: i64 = row.try_get("quiz_score").map_err(ser)?;
    let quiz_score = u32::try_from(quiz_score_i64).map_err(|_| {
        StorageError::Serialization(format!("invalid quiz_score: {quiz_score_i64}"))
    })?;

    Ok(LearningProgress {
        user_id: user_id_from_i64(row.try_get::<i64, _>("user_id").map_err(ser)?)?,
        topic: row.try_get("topic").map_err(ser)?,
        chapter: row.try_get("chapter").map_err(ser)?,
        status: parse_status(&status_str)?,
        read_duration,
        scroll_progress,
        last_position: row.try_get("last_position").map_err(ser)?,
        quiz_score,
        quiz_passed: row.try_get::<bool, _>("quiz_passed").map_err(ser)?,
        first_visit_at: row.try_get("first_visit_at").map_err(ser)?,
        last_visit_at: row.try_get("last_visit_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parsing_rejects_unknown_values() {
        assert_eq!(parse_status("tested").unwrap(), ChapterStatus::Tested);
        assert!(matches!(
            parse_status("done"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn user_id_conversions_guard_sign() {
        assert_eq!(user_id_to_i64(UserId::new(9)).unwrap(), 9);
        assert!(user_id_to_i64(UserId::new(u64::MAX)).is_err());
        assert!(user_id_from_i64(-1).is_err());
        assert_eq!(user_id_from_i64(5).unwrap(), UserId::new(5));
    }
}
