use memo_core::model::{SavedTrack, TrackDraft, TrackId};

use super::SqliteRepository;
use super::mapping::{concepts_to_json, map_track_row, ser, track_id_from_i64, track_id_to_i64};
use crate::repository::{StorageError, TrackRepository};

#[async_trait::async_trait]
impl TrackRepository for SqliteRepository {
    async fn insert_track(&self, draft: &TrackDraft) -> Result<SavedTrack, StorageError> {
        // A row that cannot map back to a `SavedTrack` would break every listing.
        draft.validate().map_err(ser)?;
        let res = sqlx::query(
            r"
            INSERT INTO tracks (title, description, topic, notes, style, concepts, audio_url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.topic)
        .bind(&draft.notes)
        .bind(&draft.style)
        .bind(concepts_to_json(&draft.concepts)?)
        .bind(&draft.audio_url)
        .bind(draft.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let id = track_id_from_i64(res.last_insert_rowid())?;
        draft.clone().into_track(id).map_err(ser)
    }

    async fn get_track(&self, id: TrackId) -> Result<Option<SavedTrack>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, description, topic, notes, style, concepts, audio_url, created_at
            FROM tracks WHERE id = ?1
            ",
        )
        .bind(track_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_track_row).transpose()
    }

    async fn list_tracks(&self, limit: u32) -> Result<Vec<SavedTrack>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, title, description, topic, notes, style, concepts, audio_url, created_at
            FROM tracks
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut tracks = Vec::with_capacity(rows.len());
        for row in rows {
            tracks.push(map_track_row(&row)?);
        }
        Ok(tracks)
    }

    async fn delete_track(&self, id: TrackId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM tracks WHERE id = ?1")
            .bind(track_id_to_i64(id)?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
