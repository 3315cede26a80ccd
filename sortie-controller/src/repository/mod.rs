//! Repository layer
//!
//! Trait-based access to the three external collaborators: the object store,
//! the compute fleet and the optional notification channel. Repositories hold
//! no business logic; services combine them.

mod fleet;
mod local;
mod notifier;
mod signing;
mod store;

// Re-export traits
pub use fleet::Fleet;
pub use notifier::Notifier;
pub use store::ObjectStore;

// Re-export implementations
pub use fleet::HttpFleet;
pub use local::LocalObjectStore;
pub use notifier::WebhookNotifier;
pub use signing::LinkSigner;

pub use fleet::{FleetError, PoolDescription};
pub use notifier::NotifyError;
pub use store::{ObjectPage, ObjectSummary, StoreError, StoredObject, list_all};
