use std::net::SocketAddr;
use std::sync::Arc;

use pedidos_api::{app, state::{AppState, AuthConfig}};
use pedidos_store::{
    DbClient, StoreCompanyRepository, StoreManifestRepository, StoreOrderRepository,
    StoreReminderRepository, StoreUserRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pedidos_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = pedidos_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Pedidos API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let app_state = AppState {
        orders: Arc::new(StoreOrderRepository::new(db.pool.clone())),
        manifests: Arc::new(StoreManifestRepository::new(db.pool.clone())),
        companies: Arc::new(StoreCompanyRepository::new(db.pool.clone())),
        reminders: Arc::new(StoreReminderRepository::new(db.pool.clone())),
        users: Arc::new(StoreUserRepository::new(db.pool.clone())),
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            access_expiration: config.auth.access_expiration_seconds,
            refresh_expiration: config.auth.refresh_expiration_seconds,
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
