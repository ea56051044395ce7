use memo_core::model::{PracticeProgress, SavedTrack, SessionId, TrackDraft, TrackId};
use sqlx::Row;

use crate::repository::{ProgressRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn track_id_from_i64(v: i64) -> Result<TrackId, StorageError> {
    u64::try_from(v)
        .map(TrackId::new)
        .map_err(|_| StorageError::Serialization("track_id sign overflow".into()))
}

pub(crate) fn track_id_to_i64(id: TrackId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("track_id overflow".into()))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_progress_row(row: &sqlx::sqlite::SqliteRow) -> Result<PracticeProgress, StorageError> {
    let completed = u32_from_i64(
        "completed_blanks",
        row.try_get::<i64, _>("completed_blanks").map_err(ser)?,
    )?;
    let total = u32_from_i64(
        "total_blanks",
        row.try_get::<i64, _>("total_blanks").map_err(ser)?,
    )?;
    let rate: f64 = row.try_get("completion_rate").map_err(ser)?;
    let last_practiced_at = row.try_get("last_practiced_at").map_err(ser)?;

    PracticeProgress::from_persisted(completed, total, rate, last_practiced_at).map_err(ser)
}

pub(crate) fn map_progress_row_with_id(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRow, StorageError> {
    let raw: String = row.try_get("session_id").map_err(ser)?;
    let session_id: SessionId = raw.parse().map_err(ser)?;
    Ok(ProgressRow {
        session_id,
        progress: map_progress_row(row)?,
    })
}

pub(crate) fn concepts_to_json(concepts: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(concepts).map_err(ser)
}

pub(crate) fn map_track_row(row: &sqlx::sqlite::SqliteRow) -> Result<SavedTrack, StorageError> {
    let id = track_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?;
    let concepts_raw: String = row.try_get("concepts").map_err(ser)?;
    let concepts: Vec<String> = serde_json::from_str(&concepts_raw).map_err(ser)?;

    TrackDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        topic: row.try_get("topic").map_err(ser)?,
        notes: row.try_get("notes").map_err(ser)?,
        style: row.try_get("style").map_err(ser)?,
        concepts,
        audio_url: row.try_get("audio_url").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    }
    .into_track(id)
    .map_err(ser)
}
