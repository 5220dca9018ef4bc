use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use crate::error::AppError;
use crate::middleware::Claims;
use crate::state::AppState;
use pedidos_core::manifest::{
    apply_meta, group_rows, validate_rows, BatchMeta, BatchReport, ManifestError, ManifestRow,
    RowInput,
};
use pedidos_core::order::OrderStatus;
use pedidos_core::repository::CompanionOrders;

// ============================================================================
// Request Types
// ============================================================================

/// The uploader sends either a bare row list or `{meta, rows}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ManifestUpload {
    Wrapped {
        #[serde(default)]
        meta: BatchMeta,
        #[serde(default)]
        rows: Vec<RowInput>,
    },
    Bare(Vec<RowInput>),
}

#[derive(Debug, Default, Deserialize)]
pub struct ManifestListQuery {
    pub ordering: Option<String>,
}

/// The ordering parameter arrives either comma-separated or as a JSON-encoded
/// list (the old frontend sent both).
fn parse_ordering(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.starts_with('[') {
        if let Ok(fields) = serde_json::from_str::<Vec<String>>(raw) {
            return fields
                .into_iter()
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
        }
    }
    pedidos_core::parse::csv_param(raw)
}

// ============================================================================
// Handlers
// ============================================================================

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/pedidos/cruceros/bulk/",
        get(list_manifest).post(bulk_upsert),
    )
}

/// GET /api/pedidos/cruceros/bulk/
async fn list_manifest(
    State(state): State<AppState>,
    Query(q): Query<ManifestListQuery>,
) -> Result<Json<Vec<ManifestRow>>, AppError> {
    let ordering = q.ordering.as_deref().map(parse_ordering).unwrap_or_default();
    let rows = state.manifests.list_rows(&ordering).await?;
    Ok(Json(rows))
}

/// POST /api/pedidos/cruceros/bulk/
/// Batch upsert with the preliminary-over-final block. Blocked groups are
/// reported in the body, not as an error.
async fn bulk_upsert(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ManifestUpload>,
) -> Result<(StatusCode, Json<BatchReport>), AppError> {
    // Print timestamp is server-assigned once for the whole batch
    let printed_at = Utc::now();

    let (meta, rows) = match payload {
        ManifestUpload::Wrapped { meta, rows } => (meta, rows),
        ManifestUpload::Bare(rows) => (BatchMeta::default(), rows),
    };

    let rows = apply_meta(&meta, rows);
    let rows = validate_rows(rows).map_err(|e| match &e {
        ManifestError::MissingKey { .. } => AppError::validation(e.to_string()),
        ManifestError::BadStatus { .. } => AppError::field("status", e.to_string()),
    })?;
    let groups = group_rows(rows);

    let companion = match meta.company_id {
        Some(company_id) => {
            let status = match meta.order_status.as_deref().map(str::trim) {
                None | Some("") => OrderStatus::Paid,
                Some(raw) => OrderStatus::parse(raw).ok_or_else(|| {
                    AppError::field("estado_pedido", format!("Estado desconocido: '{raw}'."))
                })?,
            };
            Some(CompanionOrders {
                user_id: claims.sub,
                company_id,
                status,
            })
        }
        None => None,
    };

    let report = state.manifests.bulk_upsert(groups, printed_at, companion).await?;

    tracing::info!(
        created = report.created,
        overwritten = report.overwritten,
        blocked = report.blocked,
        created_orders = report.created_orders,
        "manifest batch applied"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ordering_csv() {
        assert_eq!(
            parse_ordering("-updated_at, ship"),
            vec!["-updated_at", "ship"]
        );
    }

    #[test]
    fn test_parse_ordering_json_list() {
        assert_eq!(
            parse_ordering(r#"["-service_date", "ship"]"#),
            vec!["-service_date", "ship"]
        );
    }

    #[test]
    fn test_upload_shapes_deserialize() {
        let bare: ManifestUpload = serde_json::from_str(
            r#"[{"service_date": "2024-05-01", "ship": "Ship A", "sign": "B1", "status": "final", "pax": 30}]"#,
        )
        .unwrap();
        assert!(matches!(bare, ManifestUpload::Bare(rows) if rows.len() == 1));

        let wrapped: ManifestUpload = serde_json::from_str(
            r#"{"meta": {"ship": "Ship A", "status": "final"}, "rows": [{"service_date": "2024-05-01", "sign": "B1", "pax": 30}]}"#,
        )
        .unwrap();
        match wrapped {
            ManifestUpload::Wrapped { meta, rows } => {
                assert_eq!(meta.ship.as_deref(), Some("Ship A"));
                assert_eq!(rows.len(), 1);
            }
            _ => panic!("expected wrapped payload"),
        }
    }
}
