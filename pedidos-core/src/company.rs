use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An organization that owns orders. Users are linked to their company at
/// provisioning time through `User::company_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    #[serde(rename = "nombre")]
    pub name: String,
}
