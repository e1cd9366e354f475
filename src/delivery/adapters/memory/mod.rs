//! In-memory adapters for delivery persistence and notifications.

mod notifier;
mod store;

pub use notifier::RecordingAdminNotifier;
pub use store::InMemoryDeliveryStore;
