pub mod notifications;
pub mod orders;
