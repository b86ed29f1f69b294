pub mod catalog;
pub mod notification_service;
pub mod notifier;
pub mod order_lifecycle;
pub mod order_service;
pub mod order_store;
pub mod order_validator;
pub mod push;
