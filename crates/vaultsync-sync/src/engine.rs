//! Three-way reconciliation engine
//!
//! The [`Reconciler`] keeps a local vault and a remote object store
//! converged, using the per-path tie-points in the sync-state store to tell
//! edits from deletions.
//!
//! ## Run Flow
//!
//! 1. **Snapshot**: list both stores once; a failed remote listing aborts
//!    the run before anything is mutated
//! 2. **Plan**: classify every path ([`SyncPlan::build`])
//! 3. **Upload phase**: conflict backups, then uploads. A conflict fetches
//!    the remote version first and is backed up only once that succeeds
//! 4. **Download phase**: new files, updates, and conflicts (remote wins at
//!    the original name, written from the bytes fetched for the backup)
//! 5. **Local-deletion pass**: remove remote objects whose local file is gone
//! 6. **Remote-deletion pass**: remove local files whose remote object is
//!    gone, re-checking each file first
//!
//! The sync-state map is flushed after every phase. Cancellation is checked
//! at phase boundaries. Within a phase, up to `concurrency` paths are in
//! flight at once; workers return an outcome and only the run loop
//! writes to the map.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures_util::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use vaultsync_core::config::SyncConfig;
use vaultsync_core::domain::{
    IssueKind, PlanKind, RemoteEntry, RemoteId, RunOutcome, StoreError, SyncIssue, SyncReport, SyncState,
    SyncStateMap, VaultPath,
};
use vaultsync_core::ports::{ILocalStore, IRemoteStore, ISyncStateStore, UploadedObject, WriteMode};

use crate::clock::{Clock, SystemClock};
use crate::conflict::write_backup;
use crate::mime::mime_type_for;
use crate::planner::{
    ConflictTask, DeleteLocalTask, DeleteRemoteTask, DownloadTask, SyncPlan, UploadTask,
};
use crate::retry::{with_retry, RetryPolicy};
use crate::snapshot;
use crate::SyncError;

// ============================================================================
// Options
// ============================================================================

/// Tuning for a [`Reconciler`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerOptions {
    /// Maximum per-path operations in flight within a phase
    pub concurrency: usize,
    /// Backoff for transient remote failures
    pub retry: RetryPolicy,
    /// Remote folder that mirrors the vault root
    pub remote_folder: String,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
            remote_folder: "vault".to_string(),
        }
    }
}

impl ReconcilerOptions {
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            concurrency: config.concurrency.max(1) as usize,
            retry: RetryPolicy::from_config(config),
            remote_folder: config.remote_folder.clone(),
        }
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of one per-path operation, applied to the run by the run loop
#[derive(Debug)]
enum Outcome {
    Uploaded {
        path: VaultPath,
        state: SyncState,
        repaired: bool,
    },
    Downloaded {
        path: VaultPath,
        state: SyncState,
    },
    BackedUp {
        path: VaultPath,
        backup: VaultPath,
        remote_data: Vec<u8>,
    },
    RemoteDeleted {
        path: VaultPath,
        existed: bool,
    },
    LocalDeleted {
        path: VaultPath,
    },
    TiePointDropped {
        path: VaultPath,
        reason: &'static str,
    },
    /// Not attempted because remote operations were halted
    Skipped {
        path: VaultPath,
    },
    Failed {
        path: VaultPath,
        kind: IssueKind,
        message: String,
    },
}

/// Mutable state of one run; only the run loop touches it
#[derive(Debug, Default)]
struct RunState {
    states: SyncStateMap,
    report: SyncReport,
    /// Remote content of conflicts whose backup succeeded; a conflict
    /// without an entry here is left alone until the next run
    fetched: BTreeMap<VaultPath, Vec<u8>>,
}

impl RunState {
    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Uploaded {
                path,
                state,
                repaired,
            } => {
                if repaired && !self.report.state_repairs.contains(&path) {
                    self.report.state_repairs.push(path.clone());
                }
                self.states.insert(path, state);
                self.report.uploaded += 1;
            }
            Outcome::Downloaded { path, state } => {
                self.states.insert(path, state);
                self.report.downloaded += 1;
            }
            Outcome::BackedUp {
                path,
                backup,
                remote_data,
            } => {
                info!(%path, %backup, "Conflict: local version preserved");
                self.fetched.insert(path, remote_data);
                self.report.conflicts += 1;
            }
            Outcome::RemoteDeleted { path, existed } => {
                self.states.remove(&path);
                if existed {
                    self.report.deleted_remote += 1;
                }
            }
            Outcome::LocalDeleted { path } => {
                self.states.remove(&path);
                self.report.deleted_local += 1;
            }
            Outcome::TiePointDropped { path, reason } => {
                debug!(%path, reason, "tie-point dropped");
                self.states.remove(&path);
            }
            Outcome::Skipped { path } => {
                debug!(%path, "skipped, remote operations halted");
            }
            Outcome::Failed {
                path,
                kind,
                message,
            } => {
                self.report
                    .push_issue(SyncIssue::for_path(path, kind, message));
            }
        }
    }
}

/// Ordered phases of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Upload,
    Download,
    LocalDeletions,
    RemoteDeletions,
}

impl Phase {
    const ALL: [Phase; 4] = [
        Phase::Upload,
        Phase::Download,
        Phase::LocalDeletions,
        Phase::RemoteDeletions,
    ];
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Upload => "upload",
            Phase::Download => "download",
            Phase::LocalDeletions => "local_deletions",
            Phase::RemoteDeletions => "remote_deletions",
        };
        f.write_str(s)
    }
}

/// Maps a failure onto the issue kind the report carries
pub fn issue_kind(err: &anyhow::Error) -> IssueKind {
    if StoreError::is_auth(err) {
        IssueKind::Auth
    } else {
        IssueKind::TransientIo
    }
}

// ============================================================================
// Reconciler
// ============================================================================

/// Bidirectional reconciliation engine
///
/// ## Dependencies
///
/// - `local`: The vault ([`ILocalStore`])
/// - `remote`: The object store mirroring it ([`IRemoteStore`])
/// - `state_store`: Persistent tie-points ([`ISyncStateStore`])
pub struct Reconciler {
    local: Arc<dyn ILocalStore>,
    remote: Arc<dyn IRemoteStore>,
    state_store: Arc<dyn ISyncStateStore>,
    options: ReconcilerOptions,
    clock: Arc<dyn Clock>,
    run_lock: Mutex<()>,
}

impl Reconciler {
    pub fn new(
        local: Arc<dyn ILocalStore>,
        remote: Arc<dyn IRemoteStore>,
        state_store: Arc<dyn ISyncStateStore>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            local,
            remote,
            state_store,
            options,
            clock: Arc::new(SystemClock),
            run_lock: Mutex::new(()),
        }
    }

    /// Replaces the clock used to name conflict backups
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn options(&self) -> &ReconcilerOptions {
        &self.options
    }

    /// Computes what a run would do without changing anything
    #[instrument(skip(self))]
    pub async fn plan(&self) -> Result<SyncPlan> {
        let states = self
            .state_store
            .load()
            .await
            .context("Failed to load sync state")?;
        let snapshot = snapshot::collect(
            self.local.as_ref(),
            self.remote.as_ref(),
            &self.options.remote_folder,
            &self.options.retry,
        )
        .await?;
        Ok(SyncPlan::build(&snapshot, &states))
    }

    /// Runs one full reconciliation
    ///
    /// # Errors
    /// Only for problems that prevent the run from starting; everything
    /// else is recorded in the returned report.
    pub async fn run_sync(&self) -> Result<SyncReport, SyncError> {
        self.run_sync_with_cancel(&CancellationToken::new()).await
    }

    /// Runs one full reconciliation, stopping at the next phase boundary
    /// once `cancel` fires
    #[instrument(skip(self, cancel))]
    pub async fn run_sync_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let _guard = self
            .run_lock
            .try_lock()
            .map_err(|_| SyncError::AlreadyRunning)?;
        let started = Instant::now();

        let states = self
            .state_store
            .load()
            .await
            .map_err(|e| SyncError::StateLoad(format!("{e:#}")))?;

        let mut run = RunState {
            states,
            ..RunState::default()
        };
        let outcome = self.execute(&mut run, cancel).await;

        let mut report = run.report;
        report.outcome = outcome;
        report.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            uploaded = report.uploaded,
            downloaded = report.downloaded,
            deleted_local = report.deleted_local,
            deleted_remote = report.deleted_remote,
            conflicts = report.conflicts,
            errors = report.errors.len(),
            outcome = ?report.outcome,
            duration_ms = report.duration_ms,
            "Sync run finished"
        );
        Ok(report)
    }

    async fn execute(&self, run: &mut RunState, cancel: &CancellationToken) -> RunOutcome {
        if cancel.is_cancelled() {
            info!("Sync cancelled before start");
            return RunOutcome::Cancelled;
        }

        let snapshot = match snapshot::collect(
            self.local.as_ref(),
            self.remote.as_ref(),
            &self.options.remote_folder,
            &self.options.retry,
        )
        .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => {
                let message = format!("{err:#}");
                error!(error = %message, "Snapshot failed, nothing was changed");
                run.report
                    .push_issue(SyncIssue::run_level(issue_kind(&err), message.clone()));
                return RunOutcome::Aborted(message);
            }
        };
        for issue in &snapshot.issues {
            run.report.push_issue(issue.clone());
        }

        let plan = SyncPlan::build(&snapshot, &run.states);
        run.report.state_repairs.extend(plan.repairs.iter().cloned());

        let halt = AtomicBool::new(false);
        for phase in Phase::ALL {
            if cancel.is_cancelled() {
                info!(%phase, "Sync cancelled at phase boundary");
                return RunOutcome::Cancelled;
            }

            match phase {
                Phase::Upload => self.upload_phase(&plan, run, &halt).await,
                Phase::Download => self.download_phase(&plan, run, &halt).await,
                Phase::LocalDeletions => self.local_deletion_pass(&plan, run, &halt).await,
                Phase::RemoteDeletions => self.remote_deletion_pass(&plan, run).await,
            }

            if let Err(outcome) = self.checkpoint(run, phase).await {
                return outcome;
            }
            if halt.load(Ordering::SeqCst) {
                warn!(%phase, "Authentication failed, run aborted");
                return RunOutcome::Aborted("authentication failed".to_string());
            }
        }

        RunOutcome::Completed
    }

    /// Flushes the map; a failure ends the run
    async fn checkpoint(&self, run: &mut RunState, phase: Phase) -> Result<(), RunOutcome> {
        match self.state_store.flush(&run.states).await {
            Ok(()) => {
                debug!(%phase, entries = run.states.len(), "checkpoint");
                Ok(())
            }
            Err(err) => {
                let message = format!("Failed to persist sync state after {phase}: {err:#}");
                error!(error = %message, "Checkpoint failed");
                run.report
                    .push_issue(SyncIssue::run_level(IssueKind::StatePersistence, message.clone()));
                Err(RunOutcome::Aborted(message))
            }
        }
    }

    /// Runs `work` over `tasks` with bounded concurrency, applying each
    /// outcome to the run as it completes
    async fn run_workers<T, F, Fut>(&self, tasks: Vec<T>, run: &mut RunState, work: F)
    where
        F: Fn(T) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        let mut outcomes = stream::iter(tasks)
            .map(work)
            .buffer_unordered(self.options.concurrency.max(1));
        while let Some(outcome) = outcomes.next().await {
            run.apply(outcome);
        }
    }

    /// Records a per-path failure; authentication failures halt further
    /// remote operations and override `fallback`
    fn failure(
        &self,
        path: VaultPath,
        err: anyhow::Error,
        halt: &AtomicBool,
        fallback: IssueKind,
    ) -> Outcome {
        let kind = match issue_kind(&err) {
            IssueKind::Auth => IssueKind::Auth,
            _ => fallback,
        };
        if kind == IssueKind::Auth {
            halt.store(true, Ordering::SeqCst);
        }
        let message = format!("{err:#}");
        warn!(%path, %kind, error = %message, "Path failed, continuing");
        Outcome::Failed {
            path,
            kind,
            message,
        }
    }

    // ========================================================================
    // Upload phase
    // ========================================================================

    #[instrument(skip_all, fields(conflicts = plan.conflicts.len(), uploads = plan.uploads.len()))]
    async fn upload_phase(&self, plan: &SyncPlan, run: &mut RunState, halt: &AtomicBool) {
        let before = (run.report.uploaded, run.report.conflicts);

        self.run_workers(plan.conflicts.clone(), run, |task| self.back_up(task, halt))
            .await;
        self.run_workers(plan.uploads.clone(), run, |task| self.upload_one(task, halt))
            .await;

        info!(
            uploaded = run.report.uploaded - before.0,
            conflicts = run.report.conflicts - before.1,
            "Upload phase complete"
        );
    }

    /// Fetches the remote version, then copies the local bytes aside
    ///
    /// Nothing is written locally unless the fetch succeeded, so a conflict
    /// whose download keeps failing never accumulates backups.
    #[instrument(skip(self, task, halt), fields(path = %task.path))]
    async fn back_up(&self, task: ConflictTask, halt: &AtomicBool) -> Outcome {
        if halt.load(Ordering::SeqCst) {
            return Outcome::Skipped { path: task.path };
        }

        let remote_data = match with_retry(&self.options.retry, "download", || {
            self.remote.download(&task.remote.id)
        })
        .await
        {
            Ok(data) => data,
            Err(err) => {
                let err = err.context("Failed to fetch remote version of conflicting file");
                return self.failure(task.path, err, halt, IssueKind::TransientIo);
            }
        };

        let result = async {
            let data = self
                .local
                .read_bytes(&task.path)
                .await
                .context("Failed to read conflicting local file")?;
            write_backup(self.local.as_ref(), &task.path, &data, self.clock.now()).await
        }
        .await;

        match result {
            Ok(backup) => Outcome::BackedUp {
                path: task.path,
                backup,
                remote_data,
            },
            Err(err) => {
                let message = format!("{err:#}");
                warn!(path = %task.path, error = %message, "Conflict backup failed, path left untouched");
                Outcome::Failed {
                    path: task.path,
                    kind: IssueKind::ConflictBackup,
                    message,
                }
            }
        }
    }

    #[instrument(skip(self, task, halt), fields(path = %task.path, kind = %task.kind))]
    async fn upload_one(&self, task: UploadTask, halt: &AtomicBool) -> Outcome {
        if halt.load(Ordering::SeqCst) {
            return Outcome::Skipped { path: task.path };
        }

        let data = match self.local.read_bytes(&task.path).await {
            Ok(data) => data,
            Err(err) => {
                let err = err.context("Failed to read local file");
                return self.failure(task.path, err, halt, IssueKind::TransientIo);
            }
        };

        match self.upload_bytes(&task, &data, task.existing_id.as_ref()).await {
            Ok(state) => Outcome::Uploaded {
                path: task.path,
                state,
                repaired: false,
            },
            Err(err) if task.existing_id.is_some() && StoreError::is_not_found(&err) => {
                warn!(
                    path = %task.path,
                    "Remote object from last sync no longer exists, uploading as new"
                );
                let repaired = task.kind == PlanKind::Update;
                match self.upload_bytes(&task, &data, None).await {
                    Ok(state) => Outcome::Uploaded {
                        path: task.path,
                        state,
                        repaired,
                    },
                    Err(err) => {
                        let fallback = if repaired {
                            IssueKind::StateCorruption
                        } else {
                            IssueKind::TransientIo
                        };
                        let err = err.context("Upload after stale remote id failed");
                        self.failure(task.path, err, halt, fallback)
                    }
                }
            }
            Err(err) => {
                let err = err.context("Upload failed");
                self.failure(task.path, err, halt, IssueKind::TransientIo)
            }
        }
    }

    async fn upload_bytes(
        &self,
        task: &UploadTask,
        data: &[u8],
        existing_id: Option<&RemoteId>,
    ) -> Result<SyncState> {
        let mime_type = mime_type_for(&task.path);
        let uploaded = self
            .upload_with_retry(&task.path, data, mime_type, existing_id)
            .await?;

        let entry = self.resolve_uploaded(&task.path, mime_type, uploaded).await;
        debug!(remote_id = %entry.id, bytes = data.len(), "uploaded");
        Ok(SyncState {
            remote_id: entry.id,
            remote_mtime: Some(entry.modified_time),
            remote_content_hash: entry.content_hash,
            local_mtime_epoch: Some(task.local.mtime),
        })
    }

    async fn upload_with_retry(
        &self,
        path: &VaultPath,
        data: &[u8],
        mime_type: &str,
        existing_id: Option<&RemoteId>,
    ) -> Result<UploadedObject> {
        with_retry(&self.options.retry, "upload", || {
            self.remote.upload(path, data, mime_type, existing_id)
        })
        .await
    }

    /// Definitive metadata for a finished upload: the returned entry, else
    /// the listed entry with the same id, else one built from the id
    async fn resolve_uploaded(
        &self,
        path: &VaultPath,
        mime_type: &str,
        uploaded: UploadedObject,
    ) -> RemoteEntry {
        if let Some(entry) = uploaded.entry {
            return entry;
        }

        match with_retry(&self.options.retry, "list_remote", || {
            self.remote.list(&self.options.remote_folder)
        })
        .await
        {
            Ok(entries) => {
                if let Some(entry) = entries.into_iter().find(|e| e.id == uploaded.id) {
                    return entry;
                }
                debug!(%path, "uploaded object missing from listing");
            }
            Err(err) => debug!(%path, error = %format!("{err:#}"), "metadata lookup failed"),
        }

        RemoteEntry {
            id: uploaded.id,
            name: path.clone(),
            mime_type: mime_type.to_string(),
            modified_time: self.clock.now(),
            content_hash: None,
        }
    }

    // ========================================================================
    // Download phase
    // ========================================================================

    #[instrument(skip_all, fields(downloads = plan.downloads.len()))]
    async fn download_phase(&self, plan: &SyncPlan, run: &mut RunState, halt: &AtomicBool) {
        let before = run.report.downloaded;
        let mut fetched = std::mem::take(&mut run.fetched);
        let tasks: Vec<(DownloadTask, Option<Vec<u8>>)> = plan
            .downloads
            .iter()
            .filter_map(|task| {
                if task.kind != PlanKind::Conflict {
                    return Some((task.clone(), None));
                }
                match fetched.remove(&task.path) {
                    Some(data) => Some((task.clone(), Some(data))),
                    None => {
                        debug!(path = %task.path, "conflict not backed up, left untouched");
                        None
                    }
                }
            })
            .collect();

        self.run_workers(tasks, run, |(task, data)| {
            self.download_one(task, data, halt)
        })
        .await;

        info!(
            downloaded = run.report.downloaded - before,
            "Download phase complete"
        );
    }

    async fn download_one(
        &self,
        task: DownloadTask,
        fetched: Option<Vec<u8>>,
        halt: &AtomicBool,
    ) -> Outcome {
        if fetched.is_none() && halt.load(Ordering::SeqCst) {
            return Outcome::Skipped { path: task.path };
        }
        match self.try_download(&task, fetched).await {
            Ok(state) => Outcome::Downloaded {
                path: task.path,
                state,
            },
            Err(err) => self.failure(task.path, err, halt, IssueKind::TransientIo),
        }
    }

    #[instrument(skip(self, task, fetched), fields(path = %task.path, kind = %task.kind))]
    async fn try_download(
        &self,
        task: &DownloadTask,
        fetched: Option<Vec<u8>>,
    ) -> Result<SyncState> {
        let data = match fetched {
            Some(data) => data,
            None => with_retry(&self.options.retry, "download", || {
                self.remote.download(&task.remote.id)
            })
            .await
            .context("Download failed")?,
        };

        match task.kind {
            PlanKind::New => self
                .local
                .write_bytes(&task.path, &data, WriteMode::Create)
                .await
                .context("Failed to create local file")?,
            _ => match self
                .local
                .write_bytes(&task.path, &data, WriteMode::Overwrite)
                .await
            {
                Ok(()) => {}
                Err(err) if StoreError::is_not_found(&err) => {
                    debug!("local file vanished, creating it");
                    self.local
                        .write_bytes(&task.path, &data, WriteMode::Create)
                        .await
                        .context("Failed to recreate local file")?;
                }
                Err(err) => return Err(err.context("Failed to overwrite local file")),
            },
        }

        let written = self
            .local
            .stat(&task.path)
            .await
            .context("Failed to stat downloaded file")?
            .ok_or_else(|| StoreError::NotFound(format!("{} vanished after write", task.path)))?;

        debug!(bytes = data.len(), local_mtime = written.mtime, "downloaded");
        Ok(SyncState {
            remote_id: task.remote.id.clone(),
            remote_mtime: Some(task.remote.modified_time),
            remote_content_hash: task.remote.content_hash.clone(),
            local_mtime_epoch: Some(written.mtime),
        })
    }

    // ========================================================================
    // Deletion passes
    // ========================================================================

    /// Files deleted locally: delete the remote object
    #[instrument(skip_all, fields(candidates = plan.delete_remote.len()))]
    async fn local_deletion_pass(&self, plan: &SyncPlan, run: &mut RunState, halt: &AtomicBool) {
        let before = run.report.deleted_remote;
        self.run_workers(plan.delete_remote.clone(), run, |task| {
            self.delete_remote_one(task, halt)
        })
        .await;
        info!(
            deleted_remote = run.report.deleted_remote - before,
            "Local-deletion pass complete"
        );
    }

    async fn delete_remote_one(&self, task: DeleteRemoteTask, halt: &AtomicBool) -> Outcome {
        if halt.load(Ordering::SeqCst) {
            return Outcome::Skipped { path: task.path };
        }
        let result = with_retry(&self.options.retry, "delete_remote", || {
            self.remote.delete(&task.remote_id)
        })
        .await;

        match result {
            Ok(existed) => {
                debug!(path = %task.path, existed, "remote object deleted");
                Outcome::RemoteDeleted {
                    path: task.path,
                    existed,
                }
            }
            Err(err) if StoreError::is_not_found(&err) => Outcome::RemoteDeleted {
                path: task.path,
                existed: false,
            },
            Err(err) => {
                let err = err.context("Remote delete failed");
                self.failure(task.path, err, halt, IssueKind::TransientIo)
            }
        }
    }

    /// Objects deleted remotely: delete the local file unless it moved
    #[instrument(skip_all, fields(candidates = plan.delete_local.len()))]
    async fn remote_deletion_pass(&self, plan: &SyncPlan, run: &mut RunState) {
        let before = run.report.deleted_local;
        self.run_workers(plan.delete_local.clone(), run, |task| {
            self.delete_local_one(task)
        })
        .await;
        info!(
            deleted_local = run.report.deleted_local - before,
            "Remote-deletion pass complete"
        );
    }

    async fn delete_local_one(&self, task: DeleteLocalTask) -> Outcome {
        let current = match self.local.stat(&task.path).await {
            Ok(current) => current,
            Err(err) => {
                let err = err.context("Failed to re-check local file");
                return self.local_failure(task.path, err);
            }
        };

        match current {
            None => Outcome::TiePointDropped {
                path: task.path,
                reason: "already gone locally",
            },
            Some(entry) if entry.mtime > task.tie_point.local_mtime_ms() => {
                info!(path = %task.path, "Deleted remotely but edited locally, keeping local file");
                Outcome::TiePointDropped {
                    path: task.path,
                    reason: "edited locally after remote delete",
                }
            }
            Some(_) => match self.local.delete(&task.path).await {
                Ok(()) => {
                    debug!(path = %task.path, "local file deleted");
                    Outcome::LocalDeleted { path: task.path }
                }
                Err(err) if StoreError::is_not_found(&err) => Outcome::TiePointDropped {
                    path: task.path,
                    reason: "already gone locally",
                },
                Err(err) => {
                    let err = err.context("Local delete failed");
                    self.local_failure(task.path, err)
                }
            },
        }
    }

    fn local_failure(&self, path: VaultPath, err: anyhow::Error) -> Outcome {
        let message = format!("{err:#}");
        warn!(%path, error = %message, "Path failed, continuing");
        Outcome::Failed {
            path,
            kind: IssueKind::TransientIo,
            message,
        }
    }
}
