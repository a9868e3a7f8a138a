//! Interview definition store.
//!
//! Creation is credit-gated: the owner's balance is checked and decremented by
//! exactly one in the same transaction as the definition insert. The guarded
//! UPDATE makes check-then-decrement atomic — a zero balance updates no row
//! and the request is rejected, never clamped.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::interview::InterviewRow;

/// `credits > 0` guards the decrement; a missing or exhausted owner updates
/// no row, so the balance never goes negative.
const DEBIT_CREDIT_SQL: &str =
    "UPDATE users SET credits = credits - 1 WHERE id = $1 AND credits > 0 RETURNING credits";

pub struct NewInterview {
    pub owner_id: Uuid,
    pub job_position: String,
    pub job_description: String,
    pub duration_minutes: i32,
    pub types: Vec<String>,
    pub questions: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreatedInterview {
    pub interview_id: Uuid,
    pub remaining_credits: i32,
}

/// Storage boundary for credit-gated creation. The atomic debit-and-insert is
/// separated from the balance lookup so the rejection logic can be exercised
/// against an in-memory store.
#[async_trait]
pub trait DefinitionStore: Send + Sync {
    /// Debits one credit and inserts the definition atomically. Returns the
    /// remaining balance, or `None` when no credit row was debited — in which
    /// case nothing was inserted.
    async fn debit_and_insert(
        &self,
        interview_id: Uuid,
        new: &NewInterview,
    ) -> Result<Option<i32>, AppError>;

    /// Current balance, or `None` for an unknown owner.
    async fn owner_credits(&self, owner_id: Uuid) -> Result<Option<i32>, AppError>;
}

pub async fn create_interview(
    store: &dyn DefinitionStore,
    new: NewInterview,
) -> Result<CreatedInterview, AppError> {
    if new.questions.is_empty() {
        return Err(AppError::Validation(
            "An interview needs at least one question".to_string(),
        ));
    }

    let interview_id = Uuid::new_v4();
    if let Some(remaining_credits) = store.debit_and_insert(interview_id, &new).await? {
        info!(
            "Created interview {interview_id} for owner {} (1 credit deducted, {remaining_credits} left)",
            new.owner_id
        );
        return Ok(CreatedInterview {
            interview_id,
            remaining_credits,
        });
    }

    // No row debited: either the owner is unknown or the balance is empty.
    match store.owner_credits(new.owner_id).await? {
        None => Err(AppError::NotFound(format!(
            "User {} not found",
            new.owner_id
        ))),
        Some(_) => Err(AppError::Validation(
            "No credits left. Please purchase more to create an interview.".to_string(),
        )),
    }
}

pub struct PgDefinitionStore {
    pool: PgPool,
}

impl PgDefinitionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DefinitionStore for PgDefinitionStore {
    async fn debit_and_insert(
        &self,
        interview_id: Uuid,
        new: &NewInterview,
    ) -> Result<Option<i32>, AppError> {
        let mut tx = self.pool.begin().await?;

        let remaining: Option<i32> = sqlx::query_scalar(DEBIT_CREDIT_SQL)
            .bind(new.owner_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(remaining) = remaining else {
            // Nothing debited; dropping the transaction rolls it back.
            return Ok(None);
        };

        sqlx::query(
            r#"
            INSERT INTO interviews
                (id, owner_id, job_position, job_description, duration_minutes, types, questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(interview_id)
        .bind(new.owner_id)
        .bind(&new.job_position)
        .bind(&new.job_description)
        .bind(new.duration_minutes)
        .bind(&new.types)
        .bind(&new.questions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(remaining))
    }

    async fn owner_credits(&self, owner_id: Uuid) -> Result<Option<i32>, AppError> {
        Ok(
            sqlx::query_scalar("SELECT credits FROM users WHERE id = $1")
                .bind(owner_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }
}

pub async fn get_interview(pool: &PgPool, id: Uuid) -> Result<Option<InterviewRow>, AppError> {
    Ok(
        sqlx::query_as::<_, InterviewRow>("SELECT * FROM interviews WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?,
    )
}

/// All interviews created by one owner, newest first.
pub async fn list_interviews(pool: &PgPool, owner_id: Uuid) -> Result<Vec<InterviewRow>, AppError> {
    Ok(sqlx::query_as::<_, InterviewRow>(
        "SELECT * FROM interviews WHERE owner_id = $1 ORDER BY created_at DESC",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?)
}
