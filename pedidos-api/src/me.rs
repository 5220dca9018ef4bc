use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub is_staff: bool,
    pub empresa_name: String,
    pub empresa_id: Option<Uuid>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/me/", get(me))
}

/// GET /api/me/
/// Caller profile plus the resolved company, as the frontend expects it.
async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MeResponse>, AppError> {
    let user = state
        .users
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

    let company = match user.company_id {
        Some(company_id) => state.companies.get_company(company_id).await?,
        None => None,
    };

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        email: user.email,
        is_staff: user.is_staff,
        empresa_name: company.as_ref().map(|c| c.name.clone()).unwrap_or_default(),
        empresa_id: company.map(|c| c.id),
    }))
}
