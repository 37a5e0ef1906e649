use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::dashboard::{build_dashboard, DashboardQuery, DashboardReport};
use crate::interview::manager::SessionView;
use crate::interview::models::{ActivePanel, Candidate, CandidatePatch, NewCandidate, QuestionView};
use crate::interview::resume::extract_resume;
use crate::interview::session::SubmitOutcome;
use crate::interview::validation::validate_contact;
use crate::state::AppState;

/// Questions generated per uploaded resume.
const RESUME_QUESTION_COUNT: usize = 5;
const MAX_RESUME_QUESTION_COUNT: usize = 20;

async fn ensure_exists(state: &AppState, id: Uuid) -> Result<(), AppError> {
    if state.session.exists(id).await {
        Ok(())
    } else {
        Err(AppError::candidate_not_found(id))
    }
}

async fn require_candidate(state: &AppState, id: Uuid) -> Result<Candidate, AppError> {
    state
        .session
        .candidate(id)
        .await
        .ok_or_else(|| AppError::candidate_not_found(id))
}

// ────────────────────────────────────────────────────────────────────────────
// Session
// ────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct PanelRequest {
    pub panel: ActivePanel,
}

#[derive(Deserialize)]
pub struct FocusRequest {
    pub candidate_id: Option<Uuid>,
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionView> {
    Json(state.session.snapshot().await)
}

/// PUT /api/v1/session/panel
pub async fn handle_set_panel(
    State(state): State<AppState>,
    Json(req): Json<PanelRequest>,
) -> Json<SessionView> {
    state.session.set_active_panel(req.panel).await;
    Json(state.session.snapshot().await)
}

/// PUT /api/v1/session/focus
pub async fn handle_set_focus(
    State(state): State<AppState>,
    Json(req): Json<FocusRequest>,
) -> Result<Json<SessionView>, AppError> {
    if !state.session.set_focused_candidate(req.candidate_id).await {
        let id = req.candidate_id.map(|id| id.to_string()).unwrap_or_default();
        return Err(AppError::candidate_not_found(id));
    }
    Ok(Json(state.session.snapshot().await))
}

/// POST /api/v1/session/pause
pub async fn handle_pause(State(state): State<AppState>) -> Json<SessionView> {
    state.session.pause_interview().await;
    Json(state.session.snapshot().await)
}

// ────────────────────────────────────────────────────────────────────────────
// Roster
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/candidates
pub async fn handle_list_candidates(State(state): State<AppState>) -> Json<Vec<Candidate>> {
    Json(state.session.candidates().await)
}

/// POST /api/v1/candidates
pub async fn handle_create_candidate(
    State(state): State<AppState>,
    Json(new): Json<NewCandidate>,
) -> (StatusCode, Json<Candidate>) {
    let candidate = state.session.add_candidate(new).await;
    (StatusCode::CREATED, Json(candidate))
}

/// POST /api/v1/candidates/resume
///
/// Expects a multipart form with a `file` field. Contact details found in the
/// resume pre-fill the new candidate; resume-based practice questions are
/// generated when text could be extracted.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Candidate>), AppError> {
    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    info!("Received resume upload '{filename}' ({} bytes)", bytes.len());
    let new = tokio::task::spawn_blocking(move || extract_resume(&filename, &bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

    let resume_text = new.resume_text.clone();
    let candidate = state.session.add_candidate(new).await;

    let Some(text) = resume_text else {
        return Ok((StatusCode::CREATED, Json(candidate)));
    };
    let questions = state
        .session
        .resume_questions(&text, RESUME_QUESTION_COUNT)
        .await;
    let patch = CandidatePatch {
        resume_questions: Some(questions),
        ..Default::default()
    };
    state.session.update_candidate(candidate.id, patch).await;

    let candidate = require_candidate(&state, candidate.id).await?;
    Ok((StatusCode::CREATED, Json(candidate)))
}

/// GET /api/v1/candidates/:id
pub async fn handle_get_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, AppError> {
    Ok(Json(require_candidate(&state, id).await?))
}

/// PATCH /api/v1/candidates/:id
pub async fn handle_update_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<CandidatePatch>,
) -> Result<Json<Candidate>, AppError> {
    if !state.session.update_candidate(id, patch).await {
        return Err(AppError::candidate_not_found(id));
    }
    Ok(Json(require_candidate(&state, id).await?))
}

/// DELETE /api/v1/candidates/:id
pub async fn handle_delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.session.delete_candidate(id).await {
        return Err(AppError::candidate_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// PUT /api/v1/candidates/:id/contact
pub async fn handle_submit_contact(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ContactRequest>,
) -> Result<Json<Candidate>, AppError> {
    let candidate = require_candidate(&state, id).await?;
    if candidate.status.contact_locked() {
        return Err(AppError::Conflict(format!(
            "Candidate {id} has already started the interview"
        )));
    }

    let result = validate_contact(&req.name, &req.email, &req.phone);
    if !result.passed {
        return Err(AppError::Validation(result.describe()));
    }

    let patch = CandidatePatch {
        name: Some(req.name.trim().to_string()),
        email: Some(req.email.trim().to_string()),
        phone: Some(req.phone.trim().to_string()),
        ..Default::default()
    };
    state.session.update_candidate(id, patch).await;
    state.session.mark_ready(id).await;
    Ok(Json(require_candidate(&state, id).await?))
}

// ────────────────────────────────────────────────────────────────────────────
// Interview
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/candidates/:id/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, AppError> {
    ensure_exists(&state, id).await?;
    if !state.session.start_interview(id).await {
        return Err(AppError::Conflict(format!(
            "Candidate {id} has already started or completed the interview"
        )));
    }
    Ok(Json(require_candidate(&state, id).await?))
}

/// POST /api/v1/candidates/:id/resume-interview
pub async fn handle_resume_interview(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, AppError> {
    ensure_exists(&state, id).await?;
    if !state.session.resume_interview(id).await {
        return Err(AppError::Conflict(format!(
            "Candidate {id} has no paused interview"
        )));
    }
    Ok(Json(require_candidate(&state, id).await?))
}

/// POST /api/v1/candidates/:id/restart
pub async fn handle_restart_candidate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Candidate>, AppError> {
    ensure_exists(&state, id).await?;
    if !state.session.restart_candidate(id).await {
        return Err(AppError::Conflict(format!(
            "Candidate {id} has already completed the interview"
        )));
    }
    Ok(Json(require_candidate(&state, id).await?))
}

#[derive(Deserialize)]
pub struct SubmitAnswerRequest {
    #[serde(default)]
    pub answer: String,
    /// Slot the client believes is active; timer-driven submits should always send it.
    pub question_index: Option<usize>,
}

/// POST /api/v1/candidates/:id/answers
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<SubmitOutcome>, AppError> {
    ensure_exists(&state, id).await?;
    let outcome = state
        .session
        .submit_answer(id, req.answer, req.question_index)
        .await;
    Ok(Json(outcome))
}

#[derive(Serialize)]
pub struct TickResponse {
    pub time_remaining_seconds: u32,
    /// The client should submit whatever is in the answer box.
    pub expired: bool,
}

/// POST /api/v1/candidates/:id/tick
pub async fn handle_tick(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TickResponse>, AppError> {
    ensure_exists(&state, id).await?;
    let remaining = state
        .session
        .decrement_timer(id)
        .await
        .ok_or_else(|| AppError::Conflict(format!("Candidate {id} is not interviewing")))?;
    Ok(Json(TickResponse {
        time_remaining_seconds: remaining,
        expired: remaining == 0,
    }))
}

/// GET /api/v1/candidates/:id/question
pub async fn handle_current_question(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QuestionView>, AppError> {
    ensure_exists(&state, id).await?;
    state
        .session
        .current_question(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::Conflict(format!("Candidate {id} has no interview questions")))
}

// ────────────────────────────────────────────────────────────────────────────
// Interviewer
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/dashboard
pub async fn handle_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardReport> {
    let candidates = state.session.candidates().await;
    Json(build_dashboard(&candidates, &query))
}

#[derive(Deserialize)]
pub struct ResumeQuestionsRequest {
    pub resume_text: String,
    pub count: Option<usize>,
}

#[derive(Serialize)]
pub struct ResumeQuestionsResponse {
    pub questions: Vec<String>,
}

/// POST /api/v1/questions/from-resume
pub async fn handle_resume_questions(
    State(state): State<AppState>,
    Json(req): Json<ResumeQuestionsRequest>,
) -> Result<Json<ResumeQuestionsResponse>, AppError> {
    if req.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text must not be empty".to_string()));
    }
    let count = req.count.unwrap_or(RESUME_QUESTION_COUNT);
    if !(1..=MAX_RESUME_QUESTION_COUNT).contains(&count) {
        return Err(AppError::Validation(format!(
            "count must be between 1 and {MAX_RESUME_QUESTION_COUNT}"
        )));
    }
    let questions = state.session.resume_questions(&req.resume_text, count).await;
    Ok(Json(ResumeQuestionsResponse { questions }))
}
