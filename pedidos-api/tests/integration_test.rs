use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use jsonwebtoken::{decode, DecodingKey, Validation};
use tower::ServiceExt;
use uuid::Uuid;

use pedidos_api::auth::{hash_password, issue_token, verify_password};
use pedidos_api::error::AppError;
use pedidos_api::middleware::Claims;
use pedidos_api::orders::{build_order, OrderPayload};
use pedidos_api::state::{AppState, AuthConfig};
use pedidos_core::order::{OrderStatus, ServiceKind};
use pedidos_core::User;

mod stub {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use uuid::Uuid;

    use pedidos_core::manifest::{BatchReport, GroupKey, ManifestRow, NewRow};
    use pedidos_core::reminder::ReminderFilter;
    use pedidos_core::repository::*;
    use pedidos_core::{Company, Order, Reminder, User};

    type Err = Box<dyn std::error::Error + Send + Sync>;

    /// Backs routing-level tests that must never reach storage.
    pub struct NoStore;

    #[async_trait]
    impl OrderRepository for NoStore {
        async fn create_order(&self, _: &Order) -> Result<Uuid, Err> {
            panic!("unexpected storage access")
        }
        async fn create_orders(&self, _: &[Order]) -> Result<usize, Err> {
            panic!("unexpected storage access")
        }
        async fn get_order(&self, _: Uuid) -> Result<Option<Order>, Err> {
            panic!("unexpected storage access")
        }
        async fn update_order(&self, _: &Order) -> Result<(), Err> {
            panic!("unexpected storage access")
        }
        async fn list_orders(&self, _: &OrderQuery) -> Result<Vec<Order>, Err> {
            panic!("unexpected storage access")
        }
    }

    #[async_trait]
    impl ManifestRepository for NoStore {
        async fn list_rows(&self, _: &[String]) -> Result<Vec<ManifestRow>, Err> {
            panic!("unexpected storage access")
        }
        async fn bulk_upsert(
            &self,
            _: Vec<(GroupKey, Vec<NewRow>)>,
            _: DateTime<Utc>,
            _: Option<CompanionOrders>,
        ) -> Result<BatchReport, Err> {
            panic!("unexpected storage access")
        }
    }

    #[async_trait]
    impl CompanyRepository for NoStore {
        async fn get_company(&self, _: Uuid) -> Result<Option<Company>, Err> {
            panic!("unexpected storage access")
        }
        async fn list_companies(&self) -> Result<Vec<Company>, Err> {
            panic!("unexpected storage access")
        }
    }

    #[async_trait]
    impl ReminderRepository for NoStore {
        async fn create_reminder(&self, _: &Reminder) -> Result<Uuid, Err> {
            panic!("unexpected storage access")
        }
        async fn get_reminder(&self, _: Uuid) -> Result<Option<Reminder>, Err> {
            panic!("unexpected storage access")
        }
        async fn update_reminder(&self, _: &Reminder) -> Result<(), Err> {
            panic!("unexpected storage access")
        }
        async fn delete_reminder(&self, _: Uuid) -> Result<(), Err> {
            panic!("unexpected storage access")
        }
        async fn list_reminders(
            &self,
            _: Uuid,
            _: &ReminderFilter,
        ) -> Result<Vec<Reminder>, Err> {
            panic!("unexpected storage access")
        }
    }

    #[async_trait]
    impl UserRepository for NoStore {
        async fn get_user(&self, _: Uuid) -> Result<Option<User>, Err> {
            panic!("unexpected storage access")
        }
        async fn get_user_by_email(&self, _: &str) -> Result<Option<User>, Err> {
            panic!("unexpected storage access")
        }
    }
}

fn app_state() -> AppState {
    let store = Arc::new(stub::NoStore);
    AppState {
        orders: store.clone(),
        manifests: store.clone(),
        companies: store.clone(),
        reminders: store.clone(),
        users: store,
        auth: auth_config(),
    }
}

fn auth_config() -> AuthConfig {
    AuthConfig {
        secret: "test-secret".to_string(),
        access_expiration: 3600,
        refresh_expiration: 86400,
    }
}

fn user(is_staff: bool, company_id: Option<Uuid>) -> User {
    User {
        id: Uuid::new_v4(),
        username: "ops".to_string(),
        email: "ops@example.com".to_string(),
        password_hash: String::new(),
        is_staff,
        company_id,
    }
}

#[tokio::test]
async fn test_protected_routes_require_a_token() {
    let app = pedidos_api::app(app_state());

    for uri in ["/api/pedidos/", "/api/ops/pedidos/", "/api/reminders/", "/api/me/"] {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_refresh_token_is_rejected_for_api_access() {
    let state = app_state();
    let auth = state.auth.clone();
    let app = pedidos_api::app(state);

    let token = issue_token(&user(false, None), &auth, "refresh").unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/me/")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[test]
fn test_token_round_trip() {
    let auth = auth_config();
    let user = user(true, None);

    let token = issue_token(&user, &auth, "access").unwrap();
    let decoded = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(decoded.claims.sub, user.id);
    assert_eq!(decoded.claims.email, "ops@example.com");
    assert!(decoded.claims.staff);
    assert_eq!(decoded.claims.kind, "access");
}

#[test]
fn test_refresh_token_carries_its_kind() {
    let auth = auth_config();
    let user = user(false, None);

    let token = issue_token(&user, &auth, "refresh").unwrap();
    let decoded = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(auth.secret.as_bytes()),
        &Validation::default(),
    )
    .unwrap();

    assert_eq!(decoded.claims.kind, "refresh");
}

#[test]
fn test_password_hash_and_verify() {
    let hash = hash_password("s3cret").unwrap();
    assert!(verify_password("s3cret", &hash));
    assert!(!verify_password("wrong", &hash));
    assert!(!verify_password("s3cret", "not-a-phc-string"));
}

#[test]
fn test_order_company_resolution() {
    let company_id = Uuid::new_v4();

    let payload = OrderPayload {
        fecha_inicio: Some("2024-05-01".to_string()),
        ..Default::default()
    };

    // Non-staff without explicit company falls back to their own
    let order = build_order(&payload, &user(false, Some(company_id))).unwrap();
    assert_eq!(order.company_id, company_id);
    assert_eq!(order.status, OrderStatus::PendingPayment);

    // Non-staff with no provisioned company is rejected
    let err = build_order(&payload, &user(false, None)).unwrap_err();
    assert!(matches!(err, AppError::Validation { field: Some(f), .. } if f == "empresa"));

    // Staff must name the company explicitly
    let err = build_order(&payload, &user(true, None)).unwrap_err();
    assert!(matches!(err, AppError::Validation { field: Some(f), .. } if f == "empresa"));

    // An explicit company always wins
    let explicit = Uuid::new_v4();
    let payload = OrderPayload {
        empresa: Some(explicit),
        ..payload
    };
    let order = build_order(&payload, &user(true, None)).unwrap();
    assert_eq!(order.company_id, explicit);
}

#[test]
fn test_order_date_and_text_normalization() {
    let payload = OrderPayload {
        empresa: Some(Uuid::new_v4()),
        fecha_inicio: Some("2024-05-01T09:30:00".to_string()),
        fecha_fin: Some("".to_string()),
        excursion: Some("  Caves & Beach  ".to_string()),
        tipo_servicio: Some("dia completo".to_string()),
        ..Default::default()
    };

    let order = build_order(&payload, &user(true, None)).unwrap();
    assert_eq!(order.start_date, "2024-05-01".parse().unwrap());
    assert_eq!(order.end_date, None);
    assert_eq!(order.excursion, "Caves & Beach");
    assert_eq!(order.service_kind, ServiceKind::FullDay);
}

#[test]
fn test_order_rejects_end_before_start() {
    let payload = OrderPayload {
        empresa: Some(Uuid::new_v4()),
        fecha_inicio: Some("2024-05-10".to_string()),
        fecha_fin: Some("2024-05-09".to_string()),
        ..Default::default()
    };

    let err = build_order(&payload, &user(true, None)).unwrap_err();
    assert!(matches!(err, AppError::Validation { field: Some(f), .. } if f == "fecha_fin"));
}

#[test]
fn test_order_issuers_accepts_blank_and_numbers() {
    let base = OrderPayload {
        empresa: Some(Uuid::new_v4()),
        fecha_inicio: Some("2024-05-01".to_string()),
        ..Default::default()
    };

    let blank = OrderPayload {
        emisores: Some(serde_json::json!("")),
        ..base.clone()
    };
    assert_eq!(build_order(&blank, &user(true, None)).unwrap().issuers, None);

    let number = OrderPayload {
        emisores: Some(serde_json::json!(3)),
        ..base.clone()
    };
    assert_eq!(build_order(&number, &user(true, None)).unwrap().issuers, Some(3));

    let negative = OrderPayload {
        emisores: Some(serde_json::json!(-1)),
        ..base
    };
    assert!(build_order(&negative, &user(true, None)).is_err());
}
