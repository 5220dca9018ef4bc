use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;
use pedidos_core::order::{validate_date_range, Order, OrderEvent, OrderStatus, ServiceKind};
use pedidos_core::parse;
use pedidos_core::repository::OrderQuery;
use pedidos_core::User;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Order payload as the frontend sends it. All fields optional so the same
/// type serves create (with required-field checks) and partial update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderPayload {
    pub empresa: Option<Uuid>,
    pub excursion: Option<String>,
    pub fecha_inicio: Option<String>,
    pub fecha_fin: Option<String>,
    pub tipo_servicio: Option<String>,
    pub estado: Option<String>,
    pub lugar_entrega: Option<String>,
    pub lugar_recogida: Option<String>,
    pub notas: Option<String>,
    pub bono: Option<String>,
    pub guia: Option<String>,
    /// Accepts a number, a numeric string, "" or null.
    pub emisores: Option<serde_json::Value>,
    pub pax: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user: Uuid,
    pub empresa: Uuid,
    pub excursion: String,
    pub fecha_inicio: NaiveDate,
    pub fecha_fin: Option<NaiveDate>,
    pub tipo_servicio: ServiceKind,
    pub estado: OrderStatus,
    pub lugar_entrega: String,
    pub lugar_recogida: String,
    pub notas: String,
    pub bono: String,
    pub guia: String,
    pub emisores: Option<i32>,
    pub pax: i32,
    pub updates: Vec<OrderEvent>,
    pub fecha_creacion: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        OrderResponse {
            id: o.id,
            user: o.user_id,
            empresa: o.company_id,
            excursion: o.excursion,
            fecha_inicio: o.start_date,
            fecha_fin: o.end_date,
            tipo_servicio: o.service_kind,
            estado: o.status,
            lugar_entrega: o.delivery_place,
            lugar_recogida: o.pickup_place,
            notas: o.notes,
            bono: o.voucher,
            guia: o.guide,
            emisores: o.issuers,
            pax: o.pax,
            updates: o.events,
            fecha_creacion: o.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BulkCreateResponse {
    pub created: usize,
}

// ============================================================================
// Payload validation
// ============================================================================

fn parse_issuers(value: &Option<serde_json::Value>) -> Result<Option<i32>, AppError> {
    let Some(value) = value else { return Ok(None) };
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(None),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|n| *n >= 0)
            .map(Some)
            .ok_or_else(|| AppError::field("emisores", "Debe ser un entero no negativo.")),
        serde_json::Value::Number(n) => n
            .as_i64()
            .filter(|n| *n >= 0)
            .map(|n| Some(n as i32))
            .ok_or_else(|| AppError::field("emisores", "Debe ser un entero no negativo.")),
        _ => Err(AppError::field("emisores", "Debe ser un entero no negativo.")),
    }
}

fn parse_status(value: &str) -> Result<OrderStatus, AppError> {
    OrderStatus::parse(value)
        .ok_or_else(|| AppError::field("estado", format!("Estado desconocido: '{}'.", value.trim())))
}

fn parse_service_kind(value: &str) -> Result<ServiceKind, AppError> {
    ServiceKind::parse(value).ok_or_else(|| {
        AppError::field(
            "tipo_servicio",
            format!("Tipo de servicio desconocido: '{}'.", value.trim()),
        )
    })
}

/// Resolve the owning company: an explicit `empresa` wins; otherwise staff
/// must name one and non-staff fall back to their provisioned company.
fn resolve_company(payload: &OrderPayload, caller: &User) -> Result<Uuid, AppError> {
    if let Some(company_id) = payload.empresa {
        return Ok(company_id);
    }
    if caller.is_staff {
        return Err(AppError::field("empresa", "Empresa es obligatoria para staff."));
    }
    caller
        .company_id
        .ok_or_else(|| AppError::field("empresa", "Tu usuario no tiene empresa asignada."))
}

fn trimmed(value: &Option<String>) -> String {
    value.as_deref().unwrap_or("").trim().to_string()
}

/// Build a new order out of a creation payload for the given caller.
pub fn build_order(payload: &OrderPayload, caller: &User) -> Result<Order, AppError> {
    let company_id = resolve_company(payload, caller)?;

    let start_date = payload
        .fecha_inicio
        .as_deref()
        .and_then(parse::date_flexible)
        .ok_or_else(|| AppError::field("fecha_inicio", "Fecha de inicio obligatoria."))?;
    let end_date = match payload.fecha_fin.as_deref() {
        None => None,
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(
            parse::date_flexible(s)
                .ok_or_else(|| AppError::field("fecha_fin", "Fecha inválida."))?,
        ),
    };
    validate_date_range(start_date, end_date)
        .map_err(|_| AppError::field("fecha_fin", "Debe ser >= fecha_inicio."))?;

    let mut order = Order::new(caller.id, company_id, start_date);
    order.end_date = end_date;
    order.excursion = trimmed(&payload.excursion);
    order.delivery_place = trimmed(&payload.lugar_entrega);
    order.pickup_place = trimmed(&payload.lugar_recogida);
    order.notes = trimmed(&payload.notas);
    order.voucher = trimmed(&payload.bono);
    order.guide = trimmed(&payload.guia);
    order.issuers = parse_issuers(&payload.emisores)?;

    if let Some(ts) = payload.tipo_servicio.as_deref().map(str::trim) {
        if !ts.is_empty() {
            order.service_kind = parse_service_kind(ts)?;
        }
    }
    if let Some(estado) = payload.estado.as_deref().map(str::trim) {
        if !estado.is_empty() {
            order.status = parse_status(estado)?;
        }
    }
    if let Some(pax) = payload.pax {
        if pax < 0 {
            return Err(AppError::field("pax", "Debe ser un entero no negativo."));
        }
        order.pax = pax;
    }

    Ok(order)
}

/// Apply a partial update to an existing order.
pub fn apply_patch(order: &mut Order, payload: &OrderPayload) -> Result<(), AppError> {
    if let Some(company_id) = payload.empresa {
        order.company_id = company_id;
    }
    if let Some(s) = payload.fecha_inicio.as_deref() {
        order.start_date =
            parse::date_flexible(s).ok_or_else(|| AppError::field("fecha_inicio", "Fecha inválida."))?;
    }
    if let Some(s) = payload.fecha_fin.as_deref() {
        order.end_date = if s.trim().is_empty() {
            None
        } else {
            Some(parse::date_flexible(s).ok_or_else(|| AppError::field("fecha_fin", "Fecha inválida."))?)
        };
    }
    validate_date_range(order.start_date, order.end_date)
        .map_err(|_| AppError::field("fecha_fin", "Debe ser >= fecha_inicio."))?;

    if let Some(v) = &payload.excursion {
        order.excursion = v.trim().to_string();
    }
    if let Some(v) = &payload.lugar_entrega {
        order.delivery_place = v.trim().to_string();
    }
    if let Some(v) = &payload.lugar_recogida {
        order.pickup_place = v.trim().to_string();
    }
    if let Some(v) = &payload.notas {
        order.notes = v.trim().to_string();
    }
    if let Some(v) = &payload.bono {
        order.voucher = v.trim().to_string();
    }
    if let Some(v) = &payload.guia {
        order.guide = v.trim().to_string();
    }
    if payload.emisores.is_some() {
        order.issuers = parse_issuers(&payload.emisores)?;
    }
    if let Some(ts) = payload.tipo_servicio.as_deref().map(str::trim) {
        if !ts.is_empty() {
            order.service_kind = parse_service_kind(ts)?;
        }
    }
    if let Some(estado) = payload.estado.as_deref().map(str::trim) {
        if !estado.is_empty() {
            let next = parse_status(estado)?;
            if !order.status.can_transition(next) {
                return Err(AppError::field("estado", "Transición de estado no permitida."));
            }
            order.status = next;
        }
    }
    if let Some(pax) = payload.pax {
        if pax < 0 {
            return Err(AppError::field("pax", "Debe ser un entero no negativo."));
        }
        order.pax = pax;
    }

    Ok(())
}

pub fn ensure_owner_or_staff(claims: &Claims, order: &Order) -> Result<(), AppError> {
    if claims.staff || order.user_id == claims.sub {
        Ok(())
    } else {
        Err(AppError::Authorization(
            "No tienes permiso sobre este pedido.".to_string(),
        ))
    }
}

async fn caller(state: &AppState, claims: &Claims) -> Result<User, AppError> {
    state
        .users
        .get_user(claims.sub)
        .await?
        .ok_or_else(|| AppError::Authentication("Unknown account".to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/pedidos/", get(list_own_orders).post(create_order))
        .route("/api/pedidos/bulk/", post(bulk_create))
        .route("/api/pedidos/{id}/", get(get_order).patch(patch_order))
        .route("/api/mis-pedidos/", get(list_own_orders))
}

/// GET /api/pedidos/ and GET /api/mis-pedidos/
/// The caller's own orders, newest service date first.
async fn list_own_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let query = OrderQuery {
        user_id: Some(claims.sub),
        ..Default::default()
    };
    let orders = state.orders.list_orders(&query).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /api/pedidos/
async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<OrderPayload>,
) -> Result<(StatusCode, Json<OrderResponse>), AppError> {
    let user = caller(&state, &claims).await?;
    let order = build_order(&payload, &user)?;
    state.orders.create_order(&order).await?;
    Ok((StatusCode::CREATED, Json(OrderResponse::from(order))))
}

/// GET /api/pedidos/{id}/
async fn get_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Pedido no encontrado.".to_string()))?;
    ensure_owner_or_staff(&claims, &order)?;
    Ok(Json(OrderResponse::from(order)))
}

/// PATCH /api/pedidos/{id}/
async fn patch_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderPayload>,
) -> Result<Json<OrderResponse>, AppError> {
    let mut order = state
        .orders
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Pedido no encontrado.".to_string()))?;
    ensure_owner_or_staff(&claims, &order)?;

    apply_patch(&mut order, &payload)?;
    state.orders.update_order(&order).await?;
    Ok(Json(OrderResponse::from(order)))
}

/// POST /api/pedidos/bulk/
/// All-or-nothing creation of a list of orders.
async fn bulk_create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payloads): Json<Vec<OrderPayload>>,
) -> Result<Json<BulkCreateResponse>, AppError> {
    let user = caller(&state, &claims).await?;

    let orders = payloads
        .iter()
        .map(|p| build_order(p, &user))
        .collect::<Result<Vec<_>, _>>()?;

    let created = state.orders.create_orders(&orders).await?;
    Ok(Json(BulkCreateResponse { created }))
}
