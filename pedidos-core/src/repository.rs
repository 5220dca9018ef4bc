use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::manifest::{BatchReport, GroupKey, ManifestRow, NewRow};
use crate::order::{Order, OrderStatus, ServiceKind};
use crate::reminder::{Reminder, ReminderFilter};
use crate::{Company, User};

/// Ops-board listing filters. Empty vectors mean "no filter".
#[derive(Debug, Clone, Default)]
pub struct OrderQuery {
    pub user_id: Option<Uuid>,
    pub statuses: Vec<OrderStatus>,
    pub service_kinds: Vec<ServiceKind>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Companion orders created alongside a manifest batch when the upload
/// metadata names an owning company.
#[derive(Debug, Clone)]
pub struct CompanionOrders {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub status: OrderStatus,
}

/// Repository trait for order data access
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order(
        &self,
        order: &Order,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    /// All-or-nothing bulk creation in one transaction.
    async fn create_orders(
        &self,
        orders: &[Order],
    ) -> Result<usize, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_order(
        &self,
        id: Uuid,
    ) -> Result<Option<Order>, Box<dyn std::error::Error + Send + Sync>>;

    /// Persist every mutable field of the order, including the event log.
    async fn update_order(
        &self,
        order: &Order,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_orders(
        &self,
        query: &OrderQuery,
    ) -> Result<Vec<Order>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for cruise-manifest data access
#[async_trait]
pub trait ManifestRepository: Send + Sync {
    async fn list_rows(
        &self,
        ordering: &[String],
    ) -> Result<Vec<ManifestRow>, Box<dyn std::error::Error + Send + Sync>>;

    /// Apply a whole validated batch atomically: per (service_date, ship)
    /// group either block (preliminary over final) or delete-then-insert,
    /// plus optional companion order creation. One transaction for the batch.
    async fn bulk_upsert(
        &self,
        groups: Vec<(GroupKey, Vec<NewRow>)>,
        printed_at: DateTime<Utc>,
        companion: Option<CompanionOrders>,
    ) -> Result<BatchReport, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for company data access
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    async fn get_company(
        &self,
        id: Uuid,
    ) -> Result<Option<Company>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_companies(
        &self,
    ) -> Result<Vec<Company>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for reminder data access
#[async_trait]
pub trait ReminderRepository: Send + Sync {
    async fn create_reminder(
        &self,
        reminder: &Reminder,
    ) -> Result<Uuid, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_reminder(
        &self,
        id: Uuid,
    ) -> Result<Option<Reminder>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_reminder(
        &self,
        reminder: &Reminder,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn delete_reminder(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_reminders(
        &self,
        user_id: Uuid,
        filter: &ReminderFilter,
    ) -> Result<Vec<Reminder>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for account lookup
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;

    async fn get_user_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;
}
