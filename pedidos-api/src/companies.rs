use axum::{
    extract::{Path, State},
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;
use pedidos_core::Company;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/empresas/", get(list_companies))
        .route("/api/empresas/{id}/", get(get_company))
}

/// GET /api/empresas/
/// Staff see every company; everyone else only their own.
async fn list_companies(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Company>>, AppError> {
    if claims.staff {
        return Ok(Json(state.companies.list_companies().await?));
    }

    let user = state
        .users
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

    let own = match user.company_id {
        Some(company_id) => state.companies.get_company(company_id).await?,
        None => None,
    };
    Ok(Json(own.into_iter().collect()))
}

/// GET /api/empresas/{id}/
async fn get_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    if !claims.staff {
        let user = state
            .users
            .get_user(claims.sub)
            .await?
            .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;
        if user.company_id != Some(id) {
            return Err(AppError::NotFound("Empresa no encontrada.".to_string()));
        }
    }

    let company = state
        .companies
        .get_company(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Empresa no encontrada.".to_string()))?;
    Ok(Json(company))
}
