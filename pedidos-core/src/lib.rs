pub mod company;
pub mod manifest;
pub mod order;
pub mod parse;
pub mod reminder;
pub mod repository;
pub mod user;

pub use company::Company;
pub use manifest::{ManifestRow, ManifestStatus};
pub use order::{Order, OrderStatus, ServiceKind};
pub use reminder::Reminder;
pub use user::User;
