use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account. Logs in by email; `company_id` is assigned at provisioning
/// and scopes what non-staff users can see and create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub company_id: Option<Uuid>,
}
