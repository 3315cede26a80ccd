//! Handler context
//!
//! Everything a notification handler needs: the object store, the fleet
//! controller, the optional notifier and a few cluster-wide settings. The
//! context holds no per-job state; every invocation re-reads what it needs
//! from the store.

use std::sync::Arc;
use std::time::Duration;

use crate::repository::{Notifier, ObjectStore};
use crate::service::fleet::FleetController;

/// Default lifetime of result download links (7 days)
pub const DEFAULT_LINK_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub struct Context {
    pub store: Arc<dyn ObjectStore>,
    pub fleet: FleetController,

    /// Absent when no notification channel is configured
    pub notifier: Option<Arc<dyn Notifier>>,

    /// Shown in completion summaries
    pub cluster_name: String,

    pub link_ttl: Duration,
}

impl Context {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        fleet: FleetController,
        cluster_name: impl Into<String>,
    ) -> Self {
        Self {
            store,
            fleet,
            notifier: None,
            cluster_name: cluster_name.into(),
            link_ttl: DEFAULT_LINK_TTL,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_link_ttl(mut self, link_ttl: Duration) -> Self {
        self.link_ttl = link_ttl;
        self
    }
}
