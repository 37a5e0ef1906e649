pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::interview::handlers;
use crate::interview::resume::MAX_RESUME_BYTES;
use crate::state::AppState;

/// Room for multipart framing on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session
        .route("/api/v1/session", get(handlers::handle_get_session))
        .route("/api/v1/session/panel", put(handlers::handle_set_panel))
        .route("/api/v1/session/focus", put(handlers::handle_set_focus))
        .route("/api/v1/session/pause", post(handlers::handle_pause))
        // Roster
        .route(
            "/api/v1/candidates",
            get(handlers::handle_list_candidates).post(handlers::handle_create_candidate),
        )
        .route(
            "/api/v1/candidates/resume",
            post(handlers::handle_upload_resume)
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route(
            "/api/v1/candidates/:id",
            get(handlers::handle_get_candidate)
                .patch(handlers::handle_update_candidate)
                .delete(handlers::handle_delete_candidate),
        )
        .route(
            "/api/v1/candidates/:id/contact",
            put(handlers::handle_submit_contact),
        )
        // Interview
        .route(
            "/api/v1/candidates/:id/start",
            post(handlers::handle_start_interview),
        )
        .route(
            "/api/v1/candidates/:id/resume-interview",
            post(handlers::handle_resume_interview),
        )
        .route(
            "/api/v1/candidates/:id/restart",
            post(handlers::handle_restart_candidate),
        )
        .route(
            "/api/v1/candidates/:id/answers",
            post(handlers::handle_submit_answer),
        )
        .route("/api/v1/candidates/:id/tick", post(handlers::handle_tick))
        .route(
            "/api/v1/candidates/:id/question",
            get(handlers::handle_current_question),
        )
        // Interviewer
        .route("/api/v1/dashboard", get(handlers::handle_dashboard))
        .route(
            "/api/v1/questions/from-resume",
            post(handlers::handle_resume_questions),
        )
        .with_state(state)
}
