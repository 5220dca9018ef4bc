use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;
use pedidos_core::parse;
use pedidos_core::reminder::{validate_new, Reminder, ReminderFilter, ReminderValidationError};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ReminderListQuery {
    pub done: Option<String>,
    pub overdue: Option<String>,
    pub q: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub title: String,
    #[serde(default)]
    pub note: String,
    pub due_at: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PatchReminderRequest {
    pub title: Option<String>,
    pub note: Option<String>,
    pub due_at: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ReminderResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub title: String,
    pub note: String,
    pub due_at: DateTime<Utc>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Reminder> for ReminderResponse {
    fn from(r: Reminder) -> Self {
        ReminderResponse {
            id: r.id,
            user: r.user_id,
            title: r.title,
            note: r.note,
            due_at: r.due_at,
            done: r.done,
            created_at: r.created_at,
        }
    }
}

fn parse_due_at(raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse::datetime_flexible(raw).ok_or_else(|| AppError::field("due_at", "Fecha/hora inválida."))
}

fn validation_error(err: ReminderValidationError) -> AppError {
    match err {
        ReminderValidationError::DueInPast => {
            AppError::field("due_at", "La fecha/hora debe ser futura.")
        }
        ReminderValidationError::EmptyTitle => AppError::field("title", "Título obligatorio."),
    }
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/reminders/", get(list_reminders).post(create_reminder))
        .route(
            "/api/reminders/{id}/",
            get(get_reminder).patch(patch_reminder).delete(delete_reminder),
        )
}

/// GET /api/reminders/?done=&overdue=&q=&from=&to=
/// Always scoped to the caller; open reminders first.
async fn list_reminders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<ReminderListQuery>,
) -> Result<Json<Vec<ReminderResponse>>, AppError> {
    let filter = ReminderFilter {
        done: q.done.as_deref().and_then(parse::bool_param),
        overdue: q
            .overdue
            .as_deref()
            .and_then(parse::bool_param)
            .unwrap_or(false),
        query: q.q.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string),
        due_from: q.from.as_deref().and_then(parse::datetime_flexible),
        due_to: q.to.as_deref().and_then(parse::datetime_flexible),
    };

    let reminders = state.reminders.list_reminders(claims.sub, &filter).await?;
    Ok(Json(reminders.into_iter().map(ReminderResponse::from).collect()))
}

/// POST /api/reminders/
async fn create_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateReminderRequest>,
) -> Result<(StatusCode, Json<ReminderResponse>), AppError> {
    let due_at = parse_due_at(&req.due_at)?;
    validate_new(&req.title, due_at, Utc::now()).map_err(validation_error)?;

    let reminder = Reminder::new(
        claims.sub,
        req.title.trim().to_string(),
        req.note.trim().to_string(),
        due_at,
    );
    state.reminders.create_reminder(&reminder).await?;
    Ok((StatusCode::CREATED, Json(ReminderResponse::from(reminder))))
}

async fn load_reminder(
    state: &AppState,
    claims: &Claims,
    id: Uuid,
) -> Result<Reminder, AppError> {
    let reminder = state
        .reminders
        .get_reminder(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Recordatorio no encontrado.".to_string()))?;
    if !claims.staff && reminder.user_id != claims.sub {
        return Err(AppError::Authorization(
            "No tienes permiso sobre este recordatorio.".to_string(),
        ));
    }
    Ok(reminder)
}

/// GET /api/reminders/{id}/
async fn get_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<ReminderResponse>, AppError> {
    let reminder = load_reminder(&state, &claims, id).await?;
    Ok(Json(ReminderResponse::from(reminder)))
}

/// PATCH /api/reminders/{id}/
async fn patch_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<PatchReminderRequest>,
) -> Result<Json<ReminderResponse>, AppError> {
    let mut reminder = load_reminder(&state, &claims, id).await?;

    if let Some(title) = &req.title {
        if title.trim().is_empty() {
            return Err(AppError::field("title", "Título obligatorio."));
        }
        reminder.title = title.trim().to_string();
    }
    if let Some(note) = &req.note {
        reminder.note = note.trim().to_string();
    }
    if let Some(due_at) = &req.due_at {
        // Edits may reschedule into the past; only creation requires future
        reminder.due_at = parse_due_at(due_at)?;
    }
    if let Some(done) = req.done {
        reminder.done = done;
    }

    state.reminders.update_reminder(&reminder).await?;
    Ok(Json(ReminderResponse::from(reminder)))
}

/// DELETE /api/reminders/{id}/
async fn delete_reminder(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let reminder = load_reminder(&state, &claims, id).await?;
    state.reminders.delete_reminder(reminder.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
