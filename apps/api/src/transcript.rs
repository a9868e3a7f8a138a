//! Transcript Store — append-only log of turns per session.
//!
//! The head row is created lazily on the first append, seeded with the
//! candidate's identity. Entries are never updated, deleted, or reordered;
//! the serial entry id is the arrival order. Appends run as the engine's
//! record step, inside the session lock, so entries for one session can never
//! interleave with a concurrently retried turn.

use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::transcript::{TranscriptEntryRow, TranscriptRecord, TranscriptRow};

pub struct NewTranscriptEntry<'a> {
    pub time_label: &'a str,
    pub user_text: &'a str,
    pub ai_text: &'a str,
}

/// Appends one turn for `session_id`, creating the transcript on first use.
pub async fn append_entry(
    pool: &PgPool,
    session_id: &str,
    candidate_name: &str,
    candidate_email: &str,
    entry: NewTranscriptEntry<'_>,
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO transcripts (session_id, candidate_name, candidate_email)
        VALUES ($1, $2, $3)
        ON CONFLICT (session_id) DO NOTHING
        "#,
    )
    .bind(session_id)
    .bind(candidate_name)
    .bind(candidate_email)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO transcript_entries (session_id, time_label, user_text, ai_text)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(session_id)
    .bind(entry.time_label)
    .bind(entry.user_text)
    .bind(entry.ai_text)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Loads the full transcript for a session: head row plus entries in arrival
/// order. `None` if no turn has ever been recorded.
pub async fn load_transcript(
    pool: &PgPool,
    session_id: &str,
) -> Result<Option<TranscriptRecord>, AppError> {
    let transcript: Option<TranscriptRow> =
        sqlx::query_as("SELECT * FROM transcripts WHERE session_id = $1")
            .bind(session_id)
            .fetch_optional(pool)
            .await?;

    let Some(transcript) = transcript else {
        return Ok(None);
    };

    let entries: Vec<TranscriptEntryRow> =
        sqlx::query_as("SELECT * FROM transcript_entries WHERE session_id = $1 ORDER BY id ASC")
            .bind(session_id)
            .fetch_all(pool)
            .await?;

    Ok(Some(TranscriptRecord {
        transcript,
        entries,
    }))
}
