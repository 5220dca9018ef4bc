pub mod app_config;
pub mod company_repo;
pub mod database;
pub mod manifest_repo;
pub mod order_repo;
pub mod reminder_repo;
pub mod user_repo;

pub use company_repo::StoreCompanyRepository;
pub use database::DbClient;
pub use manifest_repo::StoreManifestRepository;
pub use order_repo::StoreOrderRepository;
pub use reminder_repo::StoreReminderRepository;
pub use user_repo::StoreUserRepository;
