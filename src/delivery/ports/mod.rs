//! Port contracts for the delivery lifecycle.
//!
//! Ports define infrastructure-agnostic interfaces used by delivery services.

pub mod notification;
pub mod rules;
pub mod store;

pub use notification::{AdminNotifier, NotificationError, NotificationResult};
pub use rules::{StatusRules, StatusRulesConfig};
pub use store::{
    DeliveryRepositoryError, DeliveryRepositoryResult, DeliveryStore, DeliveryTransaction,
};
