use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::engine::conduct_turn;
use crate::interview::session::SessionSnapshot;
use crate::interview::store::{
    create_interview, get_interview, list_interviews, CreatedInterview, NewInterview,
    PgDefinitionStore,
};
use crate::models::interview::InterviewRow;
use crate::state::AppState;
use crate::transcript::{self, NewTranscriptEntry};

#[derive(Deserialize)]
pub struct CreateInterviewRequest {
    pub owner_id: Uuid,
    pub job_position: String,
    pub job_description: String,
    pub duration_minutes: i32,
    #[serde(default)]
    pub types: Vec<String>,
    pub questions: Vec<String>,
}

/// POST /api/v1/interviews
pub async fn handle_create_interview(
    State(state): State<AppState>,
    Json(req): Json<CreateInterviewRequest>,
) -> Result<Json<CreatedInterview>, AppError> {
    let store = PgDefinitionStore::new(state.db.clone());
    let created = create_interview(
        &store,
        NewInterview {
            owner_id: req.owner_id,
            job_position: req.job_position,
            job_description: req.job_description,
            duration_minutes: req.duration_minutes,
            types: req.types,
            questions: req.questions,
        },
    )
    .await?;
    Ok(Json(created))
}

/// GET /api/v1/interviews/:id
pub async fn handle_get_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<InterviewRow>, AppError> {
    let interview = get_interview(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Interview {id} not found")))?;
    Ok(Json(interview))
}

#[derive(Deserialize)]
pub struct OwnerIdQuery {
    pub owner_id: Uuid,
}

/// GET /api/v1/interviews
pub async fn handle_list_interviews(
    State(state): State<AppState>,
    Query(params): Query<OwnerIdQuery>,
) -> Result<Json<Vec<InterviewRow>>, AppError> {
    Ok(Json(list_interviews(&state.db, params.owner_id).await?))
}

#[derive(Deserialize)]
pub struct StartSessionRequest {
    pub session_id: String,
    #[serde(default)]
    pub questions: Vec<String>,
}

/// POST /api/v1/interviews/session/start
///
/// Creates the session, or resumes an existing one unchanged (a reconnect
/// must never reset interview progress).
pub async fn handle_start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> Result<Json<SessionSnapshot>, AppError> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }
    let snapshot = state.sessions.start(&req.session_id, req.questions).await;
    Ok(Json(snapshot))
}

#[derive(Deserialize)]
pub struct TurnRequest {
    pub session_id: String,
    pub utterance: String,
    pub time_label: String,
    pub candidate_name: String,
    pub candidate_email: String,
}

#[derive(Serialize)]
pub struct TurnResponse {
    pub visible_reply: String,
    pub cursor: usize,
}

/// POST /api/v1/interviews/session/turn
///
/// Conducts one turn and appends it to the transcript. The append runs as the
/// engine's record step, inside the session lock, and only after a fully
/// successful turn: a failed generation call leaves both the session and the
/// transcript untouched, and overlapping retries cannot reorder entries.
pub async fn handle_turn(
    State(state): State<AppState>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<TurnResponse>, AppError> {
    if req.session_id.trim().is_empty() {
        return Err(AppError::Validation(
            "session_id must not be empty".to_string(),
        ));
    }
    if req.utterance.trim().is_empty() {
        return Err(AppError::Validation(
            "utterance must not be empty".to_string(),
        ));
    }

    let db = state.db.clone();
    let req_ref = &req;
    let outcome = conduct_turn(
        &state.sessions,
        state.llm.as_ref(),
        &req.session_id,
        &req.utterance,
        move |outcome| async move {
            transcript::append_entry(
                &db,
                &req_ref.session_id,
                &req_ref.candidate_name,
                &req_ref.candidate_email,
                NewTranscriptEntry {
                    time_label: &req_ref.time_label,
                    user_text: &req_ref.utterance,
                    ai_text: &outcome.visible_reply,
                },
            )
            .await?;
            Ok(outcome)
        },
    )
    .await?;

    Ok(Json(TurnResponse {
        visible_reply: outcome.visible_reply,
        cursor: outcome.cursor,
    }))
}
