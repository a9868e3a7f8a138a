use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Head row of a transcript — one per session, created on first append.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TranscriptRow {
    pub id: Uuid,
    pub session_id: String,
    pub candidate_name: String,
    pub candidate_email: String,
    pub created_at: DateTime<Utc>,
}

/// One turn of the conversation. The BIGSERIAL `id` is the arrival order;
/// entries are only ever read back ordered by it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TranscriptEntryRow {
    pub id: i64,
    pub session_id: String,
    pub time_label: String,
    pub user_text: String,
    pub ai_text: String,
    pub created_at: DateTime<Utc>,
}

/// A full transcript: head row plus entries in arrival order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptRecord {
    pub transcript: TranscriptRow,
    pub entries: Vec<TranscriptEntryRow>,
}
