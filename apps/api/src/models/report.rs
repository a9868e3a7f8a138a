use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The synthesized evaluation for one interview. `interview_id` carries a
/// UNIQUE constraint — the sole safeguard against duplicate first writes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EvaluationReportRow {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub report_text: String,
    pub created_at: DateTime<Utc>,
}
