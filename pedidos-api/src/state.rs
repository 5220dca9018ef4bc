use std::sync::Arc;

use pedidos_core::repository::{
    CompanyRepository, ManifestRepository, OrderRepository, ReminderRepository, UserRepository,
};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub access_expiration: u64,
    pub refresh_expiration: u64,
}

#[derive(Clone)]
pub struct AppState {
    pub orders: Arc<dyn OrderRepository>,
    pub manifests: Arc<dyn ManifestRepository>,
    pub companies: Arc<dyn CompanyRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
    pub users: Arc<dyn UserRepository>,
    pub auth: AuthConfig,
}
