//! Shared test helpers for reconciler integration tests
//!
//! Provides in-memory fakes of both stores with controllable clocks and
//! per-path fault injection, plus a builder that wires them into a
//! [`Reconciler`] backed by a [`MemorySyncStateStore`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use vaultsync_cache::MemorySyncStateStore;
use vaultsync_core::domain::{
    LocalEntry, RemoteEntry, RemoteId, StoreError, SyncState, SyncStateMap, VaultPath,
};
use vaultsync_core::ports::{
    ILocalStore, IRemoteStore, ListingIssue, LocalListing, UploadedObject, WriteMode,
};
use vaultsync_sync::clock::FixedClock;
use vaultsync_sync::retry::RetryPolicy;
use vaultsync_sync::{Reconciler, ReconcilerOptions};

pub fn p(s: &str) -> VaultPath {
    s.parse().expect("valid test path")
}

pub fn ms(t: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(t).unwrap()
}

// ============================================================================
// Local store fake
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalOp {
    Read,
    Write,
    Delete,
    Stat,
}

#[derive(Debug, Clone)]
struct LocalFile {
    data: Vec<u8>,
    mtime: i64,
}

/// In-memory vault
///
/// Every write stamps the file with the local clock, which then advances
/// by one millisecond.
#[derive(Debug)]
pub struct FakeLocal {
    files: Mutex<BTreeMap<VaultPath, LocalFile>>,
    clock: AtomicI64,
    unreadable: Mutex<Vec<ListingIssue>>,
    failures: Mutex<HashMap<(LocalOp, VaultPath), String>>,
    /// Edits applied the moment a path is stat-ed
    touch_on_stat: Mutex<HashMap<VaultPath, (Vec<u8>, i64)>>,
}

impl FakeLocal {
    pub fn new(clock_ms: i64) -> Self {
        Self {
            files: Mutex::new(BTreeMap::new()),
            clock: AtomicI64::new(clock_ms),
            unreadable: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            touch_on_stat: Mutex::new(HashMap::new()),
        }
    }

    pub fn put(&self, path: &str, data: &str, mtime: i64) {
        self.files.lock().unwrap().insert(
            p(path),
            LocalFile {
                data: data.as_bytes().to_vec(),
                mtime,
            },
        );
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(&p(path));
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&p(path))
            .map(|f| String::from_utf8(f.data.clone()).unwrap())
    }

    pub fn mtime(&self, path: &str) -> Option<i64> {
        self.files.lock().unwrap().get(&p(path)).map(|f| f.mtime)
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .unwrap()
            .keys()
            .map(|k| k.to_string())
            .collect()
    }

    pub fn set_clock(&self, ms: i64) {
        self.clock.store(ms, Ordering::SeqCst);
    }

    /// Report `path` (file or directory) as unreadable in listings
    pub fn mark_unreadable(&self, path: &str) {
        self.unreadable.lock().unwrap().push(ListingIssue {
            path: p(path),
            message: "permission denied".to_string(),
        });
    }

    pub fn fail(&self, op: LocalOp, path: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert((op, p(path)), format!("simulated {op:?} failure"));
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
    }

    /// Simulate an edit that lands right before the next `stat` of `path`
    pub fn edit_before_stat(&self, path: &str, data: &str, mtime: i64) {
        self.touch_on_stat
            .lock()
            .unwrap()
            .insert(p(path), (data.as_bytes().to_vec(), mtime));
    }

    fn check(&self, op: LocalOp, path: &VaultPath) -> anyhow::Result<()> {
        match self.failures.lock().unwrap().get(&(op, path.clone())) {
            Some(message) => Err(anyhow::anyhow!("{message} on {path}")),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl ILocalStore for FakeLocal {
    async fn list(&self) -> anyhow::Result<LocalListing> {
        let issues = self.unreadable.lock().unwrap().clone();
        let entries = self
            .files
            .lock()
            .unwrap()
            .iter()
            .filter(|(path, _)| !issues.iter().any(|i| path.is_within(&i.path)))
            .map(|(path, file)| LocalEntry::new(path.clone(), file.mtime))
            .collect();
        Ok(LocalListing {
            entries,
            issues,
            excluded: Vec::new(),
        })
    }

    async fn read_bytes(&self, path: &VaultPath) -> anyhow::Result<Vec<u8>> {
        self.check(LocalOp::Read, path)?;
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| f.data.clone())
            .ok_or_else(|| StoreError::NotFound(path.to_string()).into())
    }

    async fn write_bytes(
        &self,
        path: &VaultPath,
        data: &[u8],
        mode: WriteMode,
    ) -> anyhow::Result<()> {
        self.check(LocalOp::Write, path)?;
        let mut files = self.files.lock().unwrap();
        match (mode, files.contains_key(path)) {
            (WriteMode::Create, true) => {
                return Err(StoreError::AlreadyExists(path.to_string()).into())
            }
            (WriteMode::Overwrite, false) => {
                return Err(StoreError::NotFound(path.to_string()).into())
            }
            _ => {}
        }
        let mtime = self.clock.fetch_add(1, Ordering::SeqCst);
        files.insert(
            path.clone(),
            LocalFile {
                data: data.to_vec(),
                mtime,
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &VaultPath) -> anyhow::Result<()> {
        self.check(LocalOp::Delete, path)?;
        match self.files.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string()).into()),
        }
    }

    async fn stat(&self, path: &VaultPath) -> anyhow::Result<Option<LocalEntry>> {
        self.check(LocalOp::Stat, path)?;
        if let Some((data, mtime)) = self.touch_on_stat.lock().unwrap().remove(path) {
            self.files
                .lock()
                .unwrap()
                .insert(path.clone(), LocalFile { data, mtime });
        }
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|f| LocalEntry::new(path.clone(), f.mtime)))
    }
}

// ============================================================================
// Remote store fake
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    Upload,
    Download,
    Delete,
}

#[derive(Debug, Clone)]
struct RemoteObject {
    name: VaultPath,
    data: Vec<u8>,
    mime_type: String,
    modified: i64,
}

/// In-memory object store
///
/// Uploads are stamped with the server clock, which then advances by one
/// millisecond.
#[derive(Debug)]
pub struct FakeRemote {
    objects: Mutex<BTreeMap<String, RemoteObject>>,
    next_id: AtomicU64,
    clock: AtomicI64,
    failures: Mutex<HashMap<(RemoteOp, VaultPath), StoreError>>,
    list_failure: Mutex<Option<StoreError>>,
    auth_expired: AtomicBool,
    return_entries: AtomicBool,
    uploads: AtomicUsize,
    downloads: AtomicUsize,
    deletes: AtomicUsize,
    listing_gate: Mutex<Option<Arc<Notify>>>,
    cancel_on_upload: Mutex<Option<CancellationToken>>,
}

impl FakeRemote {
    pub fn new(clock_ms: i64) -> Self {
        Self {
            objects: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            clock: AtomicI64::new(clock_ms),
            failures: Mutex::new(HashMap::new()),
            list_failure: Mutex::new(None),
            auth_expired: AtomicBool::new(false),
            return_entries: AtomicBool::new(true),
            uploads: AtomicUsize::new(0),
            downloads: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            listing_gate: Mutex::new(None),
            cancel_on_upload: Mutex::new(None),
        }
    }

    /// Seed an object directly; returns its id
    pub fn put(&self, path: &str, data: &str, modified: i64) -> RemoteId {
        let id = format!("obj-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.objects.lock().unwrap().insert(
            id.clone(),
            RemoteObject {
                name: p(path),
                data: data.as_bytes().to_vec(),
                mime_type: "text/markdown".to_string(),
                modified,
            },
        );
        RemoteId::new(id).unwrap()
    }

    /// Edit an existing object in place, as another device would
    pub fn edit(&self, path: &str, data: &str, modified: i64) {
        let mut objects = self.objects.lock().unwrap();
        let object = objects
            .values_mut()
            .find(|o| o.name == p(path))
            .expect("object to edit");
        object.data = data.as_bytes().to_vec();
        object.modified = modified;
    }

    pub fn remove(&self, path: &str) {
        self.objects
            .lock()
            .unwrap()
            .retain(|_, o| o.name != p(path));
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .values()
            .find(|o| o.name == p(path))
            .map(|o| String::from_utf8(o.data.clone()).unwrap())
    }

    pub fn modified(&self, path: &str) -> Option<i64> {
        self.objects
            .lock()
            .unwrap()
            .values()
            .find(|o| o.name == p(path))
            .map(|o| o.modified)
    }

    pub fn id_of(&self, path: &str) -> Option<RemoteId> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(_, o)| o.name == p(path))
            .map(|(id, _)| RemoteId::new(id.clone()).unwrap())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .objects
            .lock()
            .unwrap()
            .values()
            .map(|o| o.name.to_string())
            .collect();
        paths.sort();
        paths
    }

    pub fn set_clock(&self, ms: i64) {
        self.clock.store(ms, Ordering::SeqCst);
    }

    pub fn fail(&self, op: RemoteOp, path: &str, error: StoreError) {
        self.failures.lock().unwrap().insert((op, p(path)), error);
    }

    pub fn fail_listing(&self, error: StoreError) {
        *self.list_failure.lock().unwrap() = Some(error);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().unwrap().clear();
        *self.list_failure.lock().unwrap() = None;
        self.auth_expired.store(false, Ordering::SeqCst);
    }

    /// Every following call fails with an authentication error
    pub fn expire_auth(&self) {
        self.auth_expired.store(true, Ordering::SeqCst);
    }

    /// Uploads return only the id; metadata must be looked up
    pub fn omit_upload_entries(&self) {
        self.return_entries.store(false, Ordering::SeqCst);
    }

    /// Listing blocks until the returned handle is notified
    pub fn hold_listing(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.listing_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Cancel `token` as soon as the first upload starts
    pub fn cancel_on_upload(&self, token: CancellationToken) {
        *self.cancel_on_upload.lock().unwrap() = Some(token);
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }

    pub fn delete_count(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    fn check_auth(&self) -> anyhow::Result<()> {
        if self.auth_expired.load(Ordering::SeqCst) {
            return Err(StoreError::Auth("token expired".to_string()).into());
        }
        Ok(())
    }

    fn check(&self, op: RemoteOp, path: &VaultPath) -> anyhow::Result<()> {
        self.check_auth()?;
        match self.failures.lock().unwrap().get(&(op, path.clone())) {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }

    fn entry(id: &str, object: &RemoteObject) -> RemoteEntry {
        RemoteEntry {
            id: RemoteId::new(id.to_string()).unwrap(),
            name: object.name.clone(),
            mime_type: object.mime_type.clone(),
            modified_time: ms(object.modified),
            content_hash: Some(format!("len-{}", object.data.len())),
        }
    }
}

#[async_trait::async_trait]
impl IRemoteStore for FakeRemote {
    async fn list(&self, _folder: &str) -> anyhow::Result<Vec<RemoteEntry>> {
        let gate = self.listing_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_auth()?;
        if let Some(error) = self.list_failure.lock().unwrap().clone() {
            return Err(error.into());
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(id, o)| Self::entry(id, o))
            .collect())
    }

    async fn upload(
        &self,
        path: &VaultPath,
        data: &[u8],
        mime_type: &str,
        existing_id: Option<&RemoteId>,
    ) -> anyhow::Result<UploadedObject> {
        if let Some(token) = self.cancel_on_upload.lock().unwrap().take() {
            token.cancel();
        }
        self.check(RemoteOp::Upload, path)?;

        let mut objects = self.objects.lock().unwrap();
        let id = match existing_id {
            Some(id) if objects.contains_key(id.as_str()) => id.as_str().to_string(),
            Some(id) => return Err(StoreError::NotFound(format!("object {id}")).into()),
            None => format!("obj-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
        };
        let object = RemoteObject {
            name: path.clone(),
            data: data.to_vec(),
            mime_type: mime_type.to_string(),
            modified: self.clock.fetch_add(1, Ordering::SeqCst),
        };
        let entry = Self::entry(&id, &object);
        objects.insert(id.clone(), object);
        self.uploads.fetch_add(1, Ordering::SeqCst);

        Ok(UploadedObject {
            id: RemoteId::new(id).unwrap(),
            entry: self.return_entries.load(Ordering::SeqCst).then_some(entry),
        })
    }

    async fn download(&self, id: &RemoteId) -> anyhow::Result<Vec<u8>> {
        let object = self.objects.lock().unwrap().get(id.as_str()).cloned();
        let Some(object) = object else {
            self.check_auth()?;
            return Err(StoreError::NotFound(format!("object {id}")).into());
        };
        self.check(RemoteOp::Download, &object.name)?;
        self.downloads.fetch_add(1, Ordering::SeqCst);
        Ok(object.data)
    }

    async fn delete(&self, id: &RemoteId) -> anyhow::Result<bool> {
        let name = self
            .objects
            .lock()
            .unwrap()
            .get(id.as_str())
            .map(|o| o.name.clone());
        match name {
            Some(name) => self.check(RemoteOp::Delete, &name)?,
            None => self.check_auth()?,
        }
        let existed = self.objects.lock().unwrap().remove(id.as_str()).is_some();
        self.deletes.fetch_add(1, Ordering::SeqCst);
        Ok(existed)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Base time for the fixtures: 2026-03-01T00:00:00Z
pub const T0: i64 = 1_772_323_200_000;

pub struct Harness {
    pub local: Arc<FakeLocal>,
    pub remote: Arc<FakeRemote>,
    pub state: Arc<MemorySyncStateStore>,
    pub clock: Arc<FixedClock>,
    pub reconciler: Reconciler,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_states(SyncStateMap::new(), 4)
    }

    pub fn with_concurrency(concurrency: usize) -> Self {
        Self::with_states(SyncStateMap::new(), concurrency)
    }

    pub fn with_states(states: SyncStateMap, concurrency: usize) -> Self {
        let local = Arc::new(FakeLocal::new(T0 + 1_000_000));
        let remote = Arc::new(FakeRemote::new(T0 + 2_000_000));
        let state = Arc::new(MemorySyncStateStore::with_states(states));
        let clock = Arc::new(FixedClock::new(ms(T0 + 3_000_000)));
        let options = ReconcilerOptions {
            concurrency,
            retry: RetryPolicy::new(2, Duration::from_millis(1)),
            remote_folder: "vault".to_string(),
        };
        let reconciler = Reconciler::new(local.clone(), remote.clone(), state.clone(), options)
            .with_clock(clock.clone());
        Self {
            local,
            remote,
            state,
            clock,
            reconciler,
        }
    }

    pub fn tie_point(&self, path: &str) -> Option<SyncState> {
        self.state.snapshot().get(&p(path)).cloned()
    }
}

/// A tie-point as a previous run would have left it
pub fn tie(remote_id: &RemoteId, local_ms: i64, remote_ms: i64) -> SyncState {
    SyncState {
        remote_id: remote_id.clone(),
        remote_mtime: Some(ms(remote_ms)),
        remote_content_hash: None,
        local_mtime_epoch: Some(local_ms),
    }
}

impl Harness {
    /// Seeds one path that both sides agree on and returns its remote id
    pub fn seed_synced(&self, path: &str, content: &str, local_ms: i64, remote_ms: i64) -> RemoteId {
        self.local.put(path, content, local_ms);
        let id = self.remote.put(path, content, remote_ms);
        self.set_tie_point(path, tie(&id, local_ms, remote_ms));
        id
    }

    /// Records a tie-point without counting a flush
    pub fn set_tie_point(&self, path: &str, state: SyncState) {
        let mut states = self.state.snapshot();
        states.insert(p(path), state);
        self.state.set_states(states);
    }
}
