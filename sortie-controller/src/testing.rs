//! In-memory fakes for service and API tests
//!
//! Every fake records the calls made against it so tests can assert on side
//! effects and their order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sortie_client::ClientError;

use crate::context::Context;
use crate::repository::{
    Fleet, FleetError, Notifier, NotifyError, ObjectPage, ObjectStore, ObjectSummary,
    PoolDescription, StoreError, StoredObject,
};
use crate::service::fleet::FleetController;

pub const BUCKET: &str = "data";
pub const POOL: &str = "test-pool";
pub const CLUSTER: &str = "test-cluster";

// =============================================================================
// Object store
// =============================================================================

/// A store operation as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Put(String),
    PutIfAbsent(String),
    Delete(String),
}

pub struct MemoryStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    writes: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<String>>,
    stalled: Mutex<HashSet<String>>,
    page_size: usize,
    list_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            writes: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            stalled: Mutex::new(HashSet::new()),
            page_size,
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Seeds an object without recording a write
    pub fn insert(&self, bucket: &str, key: &str, body: &[u8]) {
        self.insert_at(bucket, key, body, Utc::now());
    }

    pub fn insert_at(&self, bucket: &str, key: &str, body: &[u8], last_modified: DateTime<Utc>) {
        self.objects.lock().unwrap().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: body.to_vec(),
                last_modified,
            },
        );
    }

    pub fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.body.clone())
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.body(bucket, key).is_some()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    /// Every mutating call, in order
    pub fn writes(&self) -> Vec<StoreCall> {
        self.writes.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Makes every operation on `key` fail with an I/O error
    pub fn fail_on(&self, key: &str) {
        self.failing.lock().unwrap().insert(key.to_string());
    }

    /// Makes reads of `key` never complete
    pub fn stall_on(&self, key: &str) {
        self.stalled.lock().unwrap().insert(key.to_string());
    }

    fn check(&self, key: &str) -> Result<(), StoreError> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "injected failure for {}",
                key
            ))));
        }
        Ok(())
    }

    fn record(&self, call: StoreCall) {
        self.writes.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StoreError> {
        let stalled = self.stalled.lock().unwrap().contains(key);
        if stalled {
            std::future::pending::<()>().await;
        }
        self.check(key)?;
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned())
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<(), StoreError> {
        self.check(key)?;
        self.record(StoreCall::Put(key.to_string()));
        self.insert(bucket, key, &body);
        Ok(())
    }

    async fn put_object_if_absent(
        &self,
        bucket: &str,
        key: &str,
        body: Vec<u8>,
    ) -> Result<bool, StoreError> {
        self.check(key)?;
        self.record(StoreCall::PutIfAbsent(key.to_string()));

        let mut objects = self.objects.lock().unwrap();
        let slot = (bucket.to_string(), key.to_string());
        if objects.contains_key(&slot) {
            return Ok(false);
        }
        objects.insert(
            slot,
            StoredObject {
                body,
                last_modified: Utc::now(),
            },
        );
        Ok(true)
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.check(key)?;
        self.record(StoreCall::Delete(key.to_string()));
        self.objects
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
    ) -> Result<ObjectPage, StoreError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let objects = self.objects.lock().unwrap();
        let mut matching: Vec<ObjectSummary> = objects
            .iter()
            .filter(|((b, k), _)| b == bucket && k.starts_with(prefix))
            .filter(|((_, k), _)| continuation.as_deref().is_none_or(|after| k.as_str() > after))
            .map(|((_, k), object)| ObjectSummary {
                key: k.clone(),
                size: object.body.len() as u64,
                last_modified: object.last_modified,
            })
            .collect();

        let next_token = if matching.len() > self.page_size {
            matching.truncate(self.page_size);
            matching.last().map(|o| o.key.clone())
        } else {
            None
        };

        Ok(ObjectPage {
            objects: matching,
            next_token,
        })
    }

    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, StoreError> {
        Ok(format!(
            "https://links.test/{}/{}?ttl={}",
            bucket,
            key,
            expires_in.as_secs()
        ))
    }
}

// =============================================================================
// Fleet
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetCall {
    SetCapacity(u32),
    Terminate(String),
}

pub struct FakeFleet {
    pool: Mutex<PoolDescription>,
    calls: Mutex<Vec<FleetCall>>,
    fail_terminate: AtomicBool,
}

impl FakeFleet {
    pub fn new(max_size: u32) -> Self {
        Self {
            pool: Mutex::new(PoolDescription {
                name: POOL.to_string(),
                desired_capacity: 0,
                min_size: 0,
                max_size,
                current_size: 0,
            }),
            calls: Mutex::new(Vec::new()),
            fail_terminate: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> Vec<FleetCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_current_size(&self, size: u32) {
        self.pool.lock().unwrap().current_size = size;
    }

    pub fn fail_terminate(&self) {
        self.fail_terminate.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fleet for FakeFleet {
    async fn describe_pool(&self, pool: &str) -> Result<PoolDescription, FleetError> {
        let description = self.pool.lock().unwrap().clone();
        if description.name != pool {
            return Err(FleetError::PoolNotFound(pool.to_string()));
        }
        Ok(description)
    }

    async fn set_desired_capacity(&self, pool: &str, capacity: u32) -> Result<(), FleetError> {
        let mut description = self.pool.lock().unwrap();
        if description.name != pool {
            return Err(FleetError::PoolNotFound(pool.to_string()));
        }
        description.desired_capacity = capacity;
        self.calls.lock().unwrap().push(FleetCall::SetCapacity(capacity));
        Ok(())
    }

    async fn terminate_instance(&self, instance_id: &str) -> Result<(), FleetError> {
        if self.fail_terminate.load(Ordering::SeqCst) {
            return Err(FleetError::Client(ClientError::api_error(503, "unavailable")));
        }
        self.calls
            .lock()
            .unwrap()
            .push(FleetCall::Terminate(instance_id.to_string()));
        Ok(())
    }
}

// =============================================================================
// Notifier
// =============================================================================

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl FakeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery(ClientError::api_error(500, "down")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(())
    }
}

// =============================================================================
// Wiring
// =============================================================================

/// Fakes plus a context wired to them
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub fleet: Arc<FakeFleet>,
    pub notifier: Arc<FakeNotifier>,
    pub context: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_parts(MemoryStore::new(), FakeNotifier::new())
    }

    pub fn with_parts(store: MemoryStore, notifier: FakeNotifier) -> Self {
        let store = Arc::new(store);
        let fleet = Arc::new(FakeFleet::new(4));
        let notifier = Arc::new(notifier);

        let context = Context::new(
            store.clone(),
            FleetController::new(fleet.clone(), POOL),
            CLUSTER,
        )
        .with_notifier(notifier.clone());

        Self {
            store,
            fleet,
            notifier,
            context,
        }
    }
}

/// The manifest used across handler tests
pub const SCENARIO_MANIFEST: &str = r#"{
    "JobName": "t1",
    "FilesToDownload": ["a.sh"],
    "CommandsToRun": ["./a.sh"],
    "FilesToUpload": ["out.dat"],
    "NumberOfBatches": 2,
    "RunsPerNode": 1
}"#;
