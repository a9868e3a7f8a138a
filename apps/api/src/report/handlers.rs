use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::report::synthesizer::{get_report, PgReportStore, SynthesizedReport};
use crate::state::AppState;

/// GET /api/v1/interviews/:id/report
///
/// Returns the cached evaluation report, synthesizing it on first demand.
/// `source` tells the caller whether this request hit the cache ("database")
/// or paid for the single generation call ("ai").
pub async fn handle_get_report(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SynthesizedReport>, AppError> {
    let store = PgReportStore::new(state.db.clone());
    let report = get_report(&store, state.llm.as_ref(), id).await?;
    Ok(Json(report))
}
