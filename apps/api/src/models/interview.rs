use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One interview definition. The `questions` list is ordered and immutable
/// after creation; sessions copy it, they never share it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InterviewRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub job_position: String,
    pub job_description: String,
    pub duration_minutes: i32,
    pub types: Vec<String>,
    pub questions: Vec<String>,
    pub created_at: DateTime<Utc>,
}
