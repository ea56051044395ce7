use memo_core::model::{PracticeProgress, SessionId};

use super::SqliteRepository;
use super::mapping::{map_progress_row, map_progress_row_with_id};
use crate::repository::{ProgressRepository, ProgressRow, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(
        &self,
        session_id: SessionId,
        progress: &PracticeProgress,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO practice_progress (
                    session_id, completed_blanks, total_blanks, completion_rate, last_practiced_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(session_id) DO UPDATE SET
                    completed_blanks = excluded.completed_blanks,
                    total_blanks = excluded.total_blanks,
                    completion_rate = excluded.completion_rate,
                    last_practiced_at = excluded.last_practiced_at
            ",
        )
        .bind(session_id.to_string())
        .bind(i64::from(progress.completed_blanks()))
        .bind(i64::from(progress.total_blanks()))
        .bind(progress.completion_rate())
        .bind(progress.last_practiced_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_progress(
        &self,
        session_id: SessionId,
    ) -> Result<Option<PracticeProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT completed_blanks, total_blanks, completion_rate, last_practiced_at
                FROM practice_progress
                WHERE session_id = ?1
            ",
        )
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self, limit: u32) -> Result<Vec<ProgressRow>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT session_id, completed_blanks, total_blanks, completion_rate, last_practiced_at
                FROM practice_progress
                ORDER BY last_practiced_at DESC, session_id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row_with_id(&row)?);
        }
        Ok(out)
    }
}
