use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::orders::{
    apply_patch, build_order, ensure_owner_or_staff, OrderPayload, OrderResponse,
};
use crate::state::AppState;
use pedidos_core::order::{Order, OrderStatus, ServiceKind};
use pedidos_core::parse;
use pedidos_core::repository::OrderQuery;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct OpsListQuery {
    pub status: Option<String>,
    pub tipo_servicio: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveredRequest {
    pub delivered_pax: Option<i32>,
    #[serde(default)]
    pub override_pax: bool,
    pub note: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CollectedRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub ok: bool,
    pub status: &'static str,
    pub id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pax: Option<i32>,
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/ops/pedidos/", get(list_orders).post(create_order))
        .route("/api/ops/pedidos/{id}/", get(get_order).patch(patch_order))
        .route("/api/ops/pedidos/{id}/delivered/", post(mark_delivered))
        .route("/api/ops/pedidos/{id}/collected/", post(mark_collected))
}

/// Translate the comma-separated query parameters into a typed order query.
/// Unknown status/kind values are dropped rather than rejected, like the
/// board always did.
fn build_query(claims: &Claims, q: &OpsListQuery) -> OrderQuery {
    let statuses: Vec<OrderStatus> = q
        .status
        .as_deref()
        .map(parse::csv_param)
        .unwrap_or_default()
        .iter()
        .filter_map(|s| OrderStatus::parse(s))
        .collect();

    let service_kinds: Vec<ServiceKind> = q
        .tipo_servicio
        .as_deref()
        .map(parse::csv_param)
        .unwrap_or_default()
        .iter()
        .filter_map(|s| ServiceKind::parse(s))
        .collect();

    OrderQuery {
        // Staff see the whole board, everyone else their own orders
        user_id: (!claims.staff).then_some(claims.sub),
        statuses,
        service_kinds,
        date_from: q.date_from.as_deref().and_then(parse::date_flexible),
        date_to: q.date_to.as_deref().and_then(parse::date_flexible),
    }
}

/// GET /api/ops/pedidos/
async fn list_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(q): Query<OpsListQuery>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let query = build_query(&claims, &q);
    let orders = state.orders.list_orders(&query).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /api/ops/pedidos/
/// Board creation always names the company explicitly.
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    if payload.empresa.is_none() {
        return Err(AppError::field("empresa", "Empresa es obligatoria."));
    }
    let user = state
        .users
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))?;

    let order = build_order(&payload, &user)?;
    state.orders.create_order(&order).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

async fn load_order(state: &AppState, claims: &Claims, id: Uuid) -> Result<Order, AppError> {
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Pedido no encontrado.".to_string()))?;
    ensure_owner_or_staff(claims, &order)?;
    Ok(order)
}

/// GET /api/ops/pedidos/{id}/
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = load_order(&state, &claims, id).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// PATCH /api/ops/pedidos/{id}/
async fn patch_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<OrderResponse>, AppError> {
    let mut order = load_order(&state, &claims, id).await?;
    apply_patch(&mut order, &payload)?;
    state.orders.update_order(&order).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// POST /api/ops/pedidos/{id}/delivered/
/// Set the order delivered and append the event. Re-invocation appends
/// another event.
async fn mark_delivered(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<DeliveredRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let mut order = load_order(&state, &claims, id).await?;

    order.set_delivered(
        Some(claims.sub),
        Some(claims.email.clone()),
        req.note,
        req.delivered_pax,
        req.override_pax,
    );
    state.orders.update_order(&order).await?;

    Ok(Json(TransitionResponse {
        ok: true,
        status: "entregado",
        id: order.id,
        pax: Some(order.pax),
    }))
}

/// POST /api/ops/pedidos/{id}/collected/
async fn mark_collected(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(req): Json<CollectedRequest>,
) -> Result<Json<TransitionResponse>, AppError> {
    let mut order = load_order(&state, &claims, id).await?;

    order.set_collected(Some(claims.sub), Some(claims.email.clone()), req.note);
    state.orders.update_order(&order).await?;

    Ok(Json(TransitionResponse {
        ok: true,
        status: "recogido",
        id: order.id,
        pax: None,
    }))
}
