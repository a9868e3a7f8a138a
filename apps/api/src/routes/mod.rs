pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::interview::handlers as interview_handlers;
use crate::report::handlers as report_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Interview definitions (credit-gated creation)
        .route(
            "/api/v1/interviews",
            post(interview_handlers::handle_create_interview)
                .get(interview_handlers::handle_list_interviews),
        )
        .route(
            "/api/v1/interviews/:id",
            get(interview_handlers::handle_get_interview),
        )
        // Live interview sessions
        .route(
            "/api/v1/interviews/session/start",
            post(interview_handlers::handle_start_session),
        )
        .route(
            "/api/v1/interviews/session/turn",
            post(interview_handlers::handle_turn),
        )
        // Evaluation reports
        .route(
            "/api/v1/interviews/:id/report",
            get(report_handlers::handle_get_report),
        )
        .with_state(state)
}
