pub mod audit_logs;
pub mod menus;
pub mod notifications;
pub mod orders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use menus::Entity as Menus;
pub use notifications::Entity as Notifications;
pub use orders::Entity as Orders;
pub use users::Entity as Users;
