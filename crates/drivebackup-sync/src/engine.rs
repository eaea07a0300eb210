//! Backup run orchestrator
//!
//! The [`BackupEngine`] drives one backup from start to finish.
//!
//! ## Run Flow
//!
//! 1. **Plan**: resolve the backup root and the previous backup to reuse
//! 2. **Initiate**: log the account, resolve the source folder
//! 3. **Prepare**: list the whole drive into a [`RemoteTreeIndex`]
//! 4. **Download**: walk the index onto disk
//! 5. **Complete**: prune previous-backup leftovers for update/increment
//!
//! Any fatal error moves the run to `Stopped` and is returned; per-file
//! failures are only counted unless too many happen in a row.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{error, info};

use drivebackup_core::config::Config;
use drivebackup_core::domain::{BackupRun, BackupState, RemoteTreeIndex};
use drivebackup_core::ports::{
    FixedAnswer, IConfirmation, ILocalFileSystem, IProgressSink, IRemoteListing, IRemoteTransfer,
    NoProgress,
};
use drivebackup_core::usecases::{BuildIndexUseCase, ResolveSourceUseCase, SourceSelector};

use crate::context::{RunContext, RunSettings};
use crate::destination::{plan_destination, DestinationRequest};
use crate::materializer::FileMaterializer;
use crate::reconciler::Reconciler;
use crate::retention::RetentionCleaner;
use crate::BackupError;

// ============================================================================
// Request and summary
// ============================================================================

/// Everything a run needs to know up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    /// Which remote folder to back up
    pub source: SourceSelector,
    /// Directory holding all backups
    pub destination: PathBuf,
    /// Explicit backup name (default name when None)
    pub backup_name: Option<String>,
    /// Explicit previous backup name (most recent dated backup when None)
    pub prev_backup_name: Option<String>,
    /// Run policy
    pub settings: RunSettings,
    /// Local date used for the default backup name
    pub today: NaiveDate,
}

impl BackupRequest {
    /// Builds a request from the configuration
    ///
    /// A configured source name takes precedence over the source id.
    pub fn from_config(config: &Config, today: NaiveDate) -> Self {
        let backup = &config.backup;
        let source = match &backup.source {
            Some(name) => SourceSelector::Name(name.clone()),
            None => SourceSelector::Id(backup.source_id.clone()),
        };
        Self {
            source,
            destination: backup.destination.clone(),
            backup_name: backup.backup_name.clone(),
            prev_backup_name: backup.prev_backup_name.clone(),
            settings: RunSettings {
                backup_type: backup.backup_type,
                export_format: backup.export_format,
                changes_only: config.logging.changes_only,
            },
            today,
        }
    }
}

/// Summary of a finished backup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Directory the source folder was materialized under
    pub backup_root: PathBuf,
    /// Files processed, whatever the outcome
    pub files_done: u64,
    /// Folders processed
    pub folders_done: u64,
    /// Files that failed
    pub files_failed: u64,
    /// Files fetched from the remote
    pub files_downloaded: u64,
    /// Files taken from the previous backup
    pub files_reused: u64,
    /// Files that needed no work
    pub files_skipped: u64,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

// ============================================================================
// BackupEngine
// ============================================================================

/// Snapshot backup engine
///
/// ## Dependencies
///
/// - `listing`: Remote tree enumeration and account info
/// - `transfer`: Chunked downloads and exports
/// - `filesystem`: Local backup tree
/// - `confirmation`: Answers the risky-download question (declines by default)
/// - `progress`: Receives run snapshots (dropped by default)
pub struct BackupEngine {
    listing: Arc<dyn IRemoteListing>,
    transfer: Arc<dyn IRemoteTransfer>,
    filesystem: Arc<dyn ILocalFileSystem>,
    confirmation: Arc<dyn IConfirmation>,
    progress: Arc<dyn IProgressSink>,
}

impl BackupEngine {
    /// Creates an engine over the given adapters
    pub fn new(
        listing: Arc<dyn IRemoteListing>,
        transfer: Arc<dyn IRemoteTransfer>,
        filesystem: Arc<dyn ILocalFileSystem>,
    ) -> Self {
        Self {
            listing,
            transfer,
            filesystem,
            confirmation: Arc::new(FixedAnswer(false)),
            progress: Arc::new(NoProgress),
        }
    }

    /// Sets who answers the risky-download question
    pub fn with_confirmation(mut self, confirmation: Arc<dyn IConfirmation>) -> Self {
        self.confirmation = confirmation;
        self
    }

    /// Sets where progress snapshots go
    pub fn with_progress(mut self, progress: Arc<dyn IProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Plans and executes a backup
    ///
    /// # Errors
    /// Returns the fatal [`BackupError`] that stopped the run.
    pub async fn run(&self, request: &BackupRequest) -> Result<BackupSummary, BackupError> {
        let run = self.plan(request).await?;
        self.execute(request, run).await
    }

    /// Resolves and prepares the backup root
    ///
    /// Separate from [`execute`](Self::execute) so callers can set up
    /// per-backup logging inside the root before the walk starts.
    ///
    /// # Errors
    /// See [`plan_destination`].
    #[tracing::instrument(skip(self, request), fields(destination = %request.destination.display()))]
    pub async fn plan(&self, request: &BackupRequest) -> Result<BackupRun, BackupError> {
        let destination = DestinationRequest {
            destination: &request.destination,
            backup_name: request.backup_name.as_deref(),
            prev_backup_name: request.prev_backup_name.as_deref(),
            backup_type: request.settings.backup_type,
            today: request.today,
        };
        plan_destination(self.filesystem.as_ref(), &destination).await
    }

    /// Executes a planned backup
    ///
    /// # Errors
    /// Returns the fatal [`BackupError`] that stopped the run; the run's
    /// final progress snapshot is then in the `Stopped` state.
    #[tracing::instrument(skip(self, request, run), fields(root = %run.new_root.display()))]
    pub async fn execute(
        &self,
        request: &BackupRequest,
        run: BackupRun,
    ) -> Result<BackupSummary, BackupError> {
        let start = Instant::now();
        let mut ctx = RunContext::new(
            request.settings,
            self.confirmation.clone(),
            self.progress.clone(),
        );

        if let Err(err) = self.drive(&mut ctx, request, &run).await {
            error!(error = %err, "Could not complete backup");
            ctx.stop();
            return Err(err);
        }

        let counters = ctx.counters();
        let summary = BackupSummary {
            backup_root: run.new_root.clone(),
            files_done: counters.files_done,
            folders_done: counters.folders_done,
            files_failed: counters.files_failed,
            files_downloaded: counters.files_downloaded,
            files_reused: counters.files_reused,
            files_skipped: counters.files_skipped,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            files = summary.files_done,
            folders = summary.folders_done,
            failed = summary.files_failed,
            duration_ms = summary.duration_ms,
            "Backup complete"
        );
        Ok(summary)
    }

    async fn drive(
        &self,
        ctx: &mut RunContext,
        request: &BackupRequest,
        run: &BackupRun,
    ) -> Result<(), BackupError> {
        ctx.transition(BackupState::Initiated)?;

        let user = self
            .listing
            .get_user_info()
            .await
            .map_err(|e| BackupError::Listing(format!("{e:#}")))?;
        info!(user = %user.display_name, email = %user.email, "Drive account");

        let source = ResolveSourceUseCase::new(self.listing.clone())
            .execute(&request.source)
            .await?;
        info!(
            source = %source.name,
            backup_type = %run.backup_type,
            destination = %run.new_root.display(),
            previous = ?run.previous_root,
            "Backup starting"
        );

        ctx.transition(BackupState::Preparing)?;
        let mut index = self.build_index(&source.id, &source.name).await?;
        ctx.set_totals(index.totals());

        ctx.transition(BackupState::Downloading)?;
        let reconciler = Reconciler::new(
            FileMaterializer::new(self.transfer.clone(), self.filesystem.clone()),
            self.filesystem.clone(),
        );
        reconciler
            .reconcile(
                ctx,
                &mut index,
                &run.new_root,
                run.previous_root.as_deref(),
            )
            .await?;
        ctx.transition(BackupState::Complete)?;

        RetentionCleaner::new(self.filesystem.clone())
            .clean(run, &index, request.settings.export_format)
            .await
    }

    async fn build_index(
        &self,
        root_id: &drivebackup_core::domain::RemoteId,
        root_name: &str,
    ) -> Result<RemoteTreeIndex, BackupError> {
        let index = BuildIndexUseCase::new(self.listing.clone())
            .execute(root_id.clone(), root_name)
            .await
            .map_err(|e| {
                error!(error = %format!("{e:#}"), "Could not prepare the backup");
                BackupError::Listing(format!("{e:#}"))
            })?;
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::sync::Mutex;

    use chrono::{DateTime, TimeZone, Utc};
    use drivebackup_core::domain::{BackupType, ProgressSnapshot, RemoteId, FOLDER_MIME_TYPE};
    use drivebackup_core::ports::{
        Chunk, IChunkReader, ListFilter, ListPage, ListedItem, TransferError, UserInfo,
    };
    use tempfile::TempDir;

    use super::*;
    use crate::context::MAX_CONSECUTIVE_FAILURES;
    use crate::filesystem::LocalFileSystemAdapter;

    const DRIVE_ROOT: &str = "drive-root";

    // ------------------------------------------------------------------
    // In-memory drive
    // ------------------------------------------------------------------

    #[derive(Default)]
    struct FakeDrive {
        items: Vec<ListedItem>,
        contents: HashMap<String, Vec<u8>>,
        failing: HashSet<String>,
        abusive: HashSet<String>,
    }

    impl FakeDrive {
        fn folder(mut self, id: &str, name: &str, parent: &str) -> Self {
            self.items.push(ListedItem {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: FOLDER_MIME_TYPE.to_string(),
                modified_time: Some(remote_time()),
                parents: vec![parent.to_string()],
                size: None,
                shortcut_target: None,
            });
            self
        }

        fn file(mut self, id: &str, name: &str, parent: &str, content: &[u8]) -> Self {
            self.items.push(ListedItem {
                id: id.to_string(),
                name: name.to_string(),
                mime_type: "text/plain".to_string(),
                modified_time: Some(remote_time()),
                parents: vec![parent.to_string()],
                size: Some(content.len() as u64),
                shortcut_target: None,
            });
            self.contents.insert(id.to_string(), content.to_vec());
            self
        }

        fn failing(mut self, id: &str) -> Self {
            self.failing.insert(id.to_string());
            self
        }

        fn abusive(mut self, id: &str) -> Self {
            self.abusive.insert(id.to_string());
            self
        }
    }

    #[async_trait::async_trait]
    impl IRemoteListing for FakeDrive {
        async fn list_page(
            &self,
            filter: &ListFilter,
            _page_token: Option<&str>,
        ) -> anyhow::Result<ListPage> {
            let items = self
                .items
                .iter()
                .filter(|item| {
                    let parent = match filter.parent.as_deref() {
                        Some("root") => Some(DRIVE_ROOT),
                        other => other,
                    };
                    parent.map_or(true, |p| item.parents.iter().any(|q| q == p))
                        && filter.name.as_ref().map_or(true, |n| &item.name == n)
                })
                .cloned()
                .collect();
            Ok(ListPage {
                items,
                next_page_token: None,
            })
        }

        async fn get_item(&self, id: &str) -> anyhow::Result<ListedItem> {
            if id == "root" || id == DRIVE_ROOT {
                return Ok(ListedItem {
                    id: DRIVE_ROOT.to_string(),
                    name: "Meine Ablage".to_string(),
                    mime_type: FOLDER_MIME_TYPE.to_string(),
                    modified_time: None,
                    parents: Vec::new(),
                    size: None,
                    shortcut_target: None,
                });
            }
            self.items
                .iter()
                .find(|item| item.id == id)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("File not found: {id}"))
        }

        async fn get_user_info(&self) -> anyhow::Result<UserInfo> {
            Ok(UserInfo {
                email: "owner@example.com".to_string(),
                display_name: "Drive Owner".to_string(),
            })
        }
    }

    struct OneShot(Option<Result<Chunk, TransferError>>);

    #[async_trait::async_trait]
    impl IChunkReader for OneShot {
        async fn next_chunk(&mut self) -> Result<Chunk, TransferError> {
            self.0.take().unwrap_or(Err(TransferError::Cancelled))
        }
    }

    #[async_trait::async_trait]
    impl IRemoteTransfer for FakeDrive {
        async fn open_download(
            &self,
            id: &RemoteId,
            acknowledge_abuse: bool,
            offset: u64,
        ) -> Result<Box<dyn IChunkReader>, TransferError> {
            let id = id.as_str();
            let result = if self.failing.contains(id) {
                Err(TransferError::Http {
                    status: 500,
                    message: "Backend Error".to_string(),
                })
            } else if self.abusive.contains(id) && !acknowledge_abuse {
                Err(TransferError::AbusiveFile)
            } else {
                let data = self.contents.get(id).cloned().unwrap_or_default();
                Ok(Chunk {
                    total_size: Some(data.len() as u64),
                    data: data[offset as usize..].to_vec(),
                    done: true,
                })
            };
            Ok(Box::new(OneShot(Some(result))))
        }

        async fn open_export(
            &self,
            id: &RemoteId,
            _mime_type: &str,
        ) -> Result<Box<dyn IChunkReader>, TransferError> {
            self.open_download(id, false, 0).await
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<ProgressSnapshot>>);

    impl IProgressSink for RecordingProgress {
        fn on_progress(&self, snapshot: ProgressSnapshot) {
            self.0.lock().unwrap().push(snapshot);
        }
    }

    impl RecordingProgress {
        fn last(&self) -> ProgressSnapshot {
            *self.0.lock().unwrap().last().unwrap()
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn remote_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 20, 12, 30, 0).unwrap()
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    fn request(destination: &Path, backup_type: BackupType) -> BackupRequest {
        BackupRequest {
            source: SourceSelector::Id("root".to_string()),
            destination: destination.to_path_buf(),
            backup_name: None,
            prev_backup_name: None,
            settings: RunSettings {
                backup_type,
                ..Default::default()
            },
            today: today(),
        }
    }

    fn engine(drive: FakeDrive) -> (BackupEngine, Arc<RecordingProgress>) {
        let drive = Arc::new(drive);
        let progress = Arc::new(RecordingProgress::default());
        let engine = BackupEngine::new(
            drive.clone(),
            drive,
            Arc::new(LocalFileSystemAdapter::new()),
        )
        .with_progress(progress.clone());
        (engine, progress)
    }

    async fn write_current(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        LocalFileSystemAdapter::new()
            .set_modified(path, remote_time())
            .await
            .unwrap();
    }

    /// Writes a file whose mtime predates the remote modification time
    async fn write_stale(path: &Path, content: &[u8]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        LocalFileSystemAdapter::new()
            .set_modified(path, remote_time() - chrono::Duration::days(30))
            .await
            .unwrap();
    }

    const NEW: &str = "Google Drive Backup 3-7-2024";
    const PREVIOUS: &str = "Google Drive Backup 3-1-2024";

    // ------------------------------------------------------------------
    // Complete runs
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_complete_backup_materializes_tree() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .file("f1", "notes.txt", DRIVE_ROOT, b"notes")
            // Child listed before its folder
            .file("f2", "plan.txt", "docs", b"plan")
            .folder("docs", "docs", DRIVE_ROOT)
            .file("f3", "empty.txt", DRIVE_ROOT, b"");
        let (engine, progress) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();

        let root = tmp.path().join(NEW).join("My Drive");
        assert_eq!(std::fs::read(root.join("notes.txt")).unwrap(), b"notes");
        assert_eq!(std::fs::read(root.join("docs/plan.txt")).unwrap(), b"plan");
        assert_eq!(std::fs::read(root.join("empty.txt")).unwrap().len(), 0);

        assert_eq!(summary.backup_root, tmp.path().join(NEW));
        assert_eq!(summary.files_done, 3);
        assert_eq!(summary.folders_done, 2);
        assert_eq!(summary.files_downloaded, 2);
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.files_failed, 0);

        let last = progress.last();
        assert_eq!(last.state, BackupState::Complete);
        assert_eq!(last.total_files, 3);
        assert_eq!(last.total_folders, 2);
    }

    #[tokio::test]
    async fn test_complete_backup_copies_and_leaves_previous_untouched() {
        let tmp = TempDir::new().unwrap();
        let previous_file = tmp.path().join(PREVIOUS).join("My Drive/notes.txt");
        write_current(&previous_file, b"from previous").await;
        let drive = FakeDrive::default().file("f1", "notes.txt", DRIVE_ROOT, b"from remote");
        let (engine, _) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();

        assert_eq!(summary.files_reused, 1);
        assert_eq!(
            std::fs::read(tmp.path().join(NEW).join("My Drive/notes.txt")).unwrap(),
            b"from previous"
        );
        assert_eq!(std::fs::read(&previous_file).unwrap(), b"from previous");
    }

    #[tokio::test]
    async fn test_duplicate_names_are_disambiguated() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .file("f1", "a.txt", DRIVE_ROOT, b"one")
            .file("f2", "a.txt", DRIVE_ROOT, b"two")
            .folder("d1", "docs", DRIVE_ROOT)
            .folder("d2", "docs", DRIVE_ROOT)
            .file("f3", "x.txt", "d1", b"x1")
            .file("f4", "x.txt", "d2", b"x2");
        let (engine, _) = engine(drive);

        engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();

        let root = tmp.path().join(NEW).join("My Drive");
        assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"one");
        assert_eq!(std::fs::read(root.join("a (1).txt")).unwrap(), b"two");
        assert_eq!(std::fs::read(root.join("docs/x.txt")).unwrap(), b"x1");
        assert_eq!(std::fs::read(root.join("docs (1)/x.txt")).unwrap(), b"x2");
    }

    // ------------------------------------------------------------------
    // Increment and update
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_increment_moves_unchanged_and_keeps_changed_and_deleted() {
        let tmp = TempDir::new().unwrap();
        let previous = tmp.path().join(PREVIOUS).join("My Drive");
        write_current(&previous.join("a.txt"), b"old a").await;
        write_stale(&previous.join("b.txt"), b"old b").await;
        write_current(&previous.join("gone.txt"), b"deleted remotely").await;
        write_current(&previous.join("docs/c.txt"), b"old c").await;
        let drive = FakeDrive::default()
            .file("fa", "a.txt", DRIVE_ROOT, b"remote a")
            .file("fb", "b.txt", DRIVE_ROOT, b"remote b")
            .folder("docs", "docs", DRIVE_ROOT)
            .file("fc", "c.txt", "docs", b"remote c");
        let (engine, _) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Increment))
            .await
            .unwrap();

        let current = tmp.path().join(NEW).join("My Drive");
        assert_eq!(summary.files_reused, 2);
        assert_eq!(summary.files_downloaded, 1);
        assert_eq!(std::fs::read(current.join("a.txt")).unwrap(), b"old a");
        assert_eq!(std::fs::read(current.join("b.txt")).unwrap(), b"remote b");
        assert_eq!(std::fs::read(current.join("docs/c.txt")).unwrap(), b"old c");

        // Changed and deleted files stay behind in the previous backup
        assert!(!previous.join("a.txt").exists());
        assert_eq!(std::fs::read(previous.join("b.txt")).unwrap(), b"old b");
        assert!(previous.join("gone.txt").exists());
        assert!(!previous.join("docs").exists());
        assert!(!current.join("gone.txt").exists());
    }

    #[tokio::test]
    async fn test_update_refreshes_in_place_and_removes_deleted() {
        let tmp = TempDir::new().unwrap();
        let previous = tmp.path().join(PREVIOUS).join("My Drive");
        write_current(&previous.join("a.txt"), b"kept").await;
        write_current(&previous.join("gone.txt"), b"deleted remotely").await;
        write_current(&previous.join("old/x.txt"), b"folder deleted remotely").await;
        let drive = FakeDrive::default()
            .file("fa", "a.txt", DRIVE_ROOT, b"remote a")
            .file("fn", "new.txt", DRIVE_ROOT, b"new");
        let (engine, _) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Update))
            .await
            .unwrap();

        let current = tmp.path().join(NEW).join("My Drive");
        assert!(!tmp.path().join(PREVIOUS).exists());
        assert_eq!(std::fs::read(current.join("a.txt")).unwrap(), b"kept");
        assert_eq!(std::fs::read(current.join("new.txt")).unwrap(), b"new");
        assert!(!current.join("gone.txt").exists());
        assert!(!current.join("old").exists());
        assert_eq!(summary.files_skipped, 1);
        assert_eq!(summary.files_downloaded, 1);
    }

    #[tokio::test]
    async fn test_repeated_update_keeps_disambiguated_names() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .file("f1", "a.txt", DRIVE_ROOT, b"one")
            .file("f2", "a.txt", DRIVE_ROOT, b"two")
            .folder("d1", "docs", DRIVE_ROOT)
            .folder("d2", "docs", DRIVE_ROOT)
            .file("f3", "x.txt", "d1", b"x1")
            .file("f4", "x.txt", "d2", b"x2");
        let (engine, _) = engine(drive);
        let req = request(tmp.path(), BackupType::Update);

        engine.run(&req).await.unwrap();
        let summary = engine.run(&req).await.unwrap();

        // Cleanup matches entries against the renamed index records
        let root = tmp.path().join(NEW).join("My Drive");
        assert_eq!(std::fs::read(root.join("a.txt")).unwrap(), b"one");
        assert_eq!(std::fs::read(root.join("a (1).txt")).unwrap(), b"two");
        assert_eq!(std::fs::read(root.join("docs/x.txt")).unwrap(), b"x1");
        assert_eq!(std::fs::read(root.join("docs (1)/x.txt")).unwrap(), b"x2");
        assert_eq!(summary.files_skipped, 4);
        assert_eq!(summary.files_downloaded, 0);
    }

    // ------------------------------------------------------------------
    // Failures
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_consecutive_failures_stop_the_run() {
        let tmp = TempDir::new().unwrap();
        let mut drive = FakeDrive::default().file("f0", "ok.txt", DRIVE_ROOT, b"ok");
        for n in 1..=6 {
            let id = format!("f{n}");
            drive = drive
                .file(&id, &format!("bad-{n}.txt"), DRIVE_ROOT, b"never")
                .failing(&id);
        }
        let (engine, progress) = engine(drive);

        let err = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap_err();

        assert!(matches!(err, BackupError::TooManyFailures(n) if n == MAX_CONSECUTIVE_FAILURES));
        let root = tmp.path().join(NEW).join("My Drive");
        assert_eq!(std::fs::read(root.join("ok.txt")).unwrap(), b"ok");
        assert!(!root.join("bad-1.txt").exists());
        assert!(!root.join("bad-6.txt").exists());

        let last = progress.last();
        assert_eq!(last.state, BackupState::Stopped);
        assert_eq!(last.files_done, 1 + u64::from(MAX_CONSECUTIVE_FAILURES));
    }

    #[tokio::test]
    async fn test_interleaved_failures_do_not_stop_the_run() {
        let tmp = TempDir::new().unwrap();
        let mut drive = FakeDrive::default();
        for n in 0..10 {
            let id = format!("f{n}");
            drive = drive.file(&id, &format!("file-{n}.txt"), DRIVE_ROOT, b"data");
            if n % 2 == 0 {
                drive = drive.failing(&id);
            }
        }
        let (engine, _) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();
        assert_eq!(summary.files_failed, 5);
        assert_eq!(summary.files_downloaded, 5);
    }

    #[tokio::test]
    async fn test_unknown_source_name_stops_the_run() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default().folder("d1", "Work", DRIVE_ROOT);
        let (engine, progress) = engine(drive);
        let mut req = request(tmp.path(), BackupType::Complete);
        req.source = SourceSelector::Name("Photos".to_string());

        let err = engine.run(&req).await.unwrap_err();

        assert!(matches!(err, BackupError::SourceNotFound(_)));
        assert_eq!(progress.last().state, BackupState::Stopped);
    }

    #[tokio::test]
    async fn test_named_source_folder_is_backed_up_alone() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .folder("d1", "Work", DRIVE_ROOT)
            .file("f1", "report.txt", "d1", b"report")
            .file("f2", "outside.txt", DRIVE_ROOT, b"outside");
        let (engine, _) = engine(drive);
        let mut req = request(tmp.path(), BackupType::Complete);
        req.source = SourceSelector::Name("Work".to_string());

        let summary = engine.run(&req).await.unwrap();

        let root = tmp.path().join(NEW);
        assert_eq!(std::fs::read(root.join("Work/report.txt")).unwrap(), b"report");
        assert!(!root.join("Work/outside.txt").exists());
        assert_eq!(summary.files_done, 1);
    }

    // ------------------------------------------------------------------
    // Abusive files
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_abusive_file_downloaded_after_confirmation() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .file("f1", "setup.exe", DRIVE_ROOT, b"binary")
            .abusive("f1");
        let (engine, progress) = engine(drive);
        let engine = engine.with_confirmation(Arc::new(FixedAnswer(true)));

        let summary = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();

        assert_eq!(summary.files_downloaded, 1);
        let states: Vec<_> = progress.0.lock().unwrap().iter().map(|s| s.state).collect();
        assert!(states.contains(&BackupState::Paused));
    }

    #[tokio::test]
    async fn test_abusive_file_declined_by_default() {
        let tmp = TempDir::new().unwrap();
        let drive = FakeDrive::default()
            .file("f1", "setup.exe", DRIVE_ROOT, b"binary")
            .abusive("f1");
        let (engine, _) = engine(drive);

        let summary = engine
            .run(&request(tmp.path(), BackupType::Complete))
            .await
            .unwrap();

        assert_eq!(summary.files_failed, 1);
        assert!(!tmp.path().join(NEW).join("My Drive/setup.exe").exists());
    }

    // ------------------------------------------------------------------
    // Request
    // ------------------------------------------------------------------

    #[test]
    fn test_request_from_config_prefers_source_name() {
        let mut config = Config::default();
        config.backup.source = Some("Work".to_string());
        config.backup.backup_type = BackupType::Increment;
        config.logging.changes_only = true;

        let req = BackupRequest::from_config(&config, today());
        assert_eq!(req.source, SourceSelector::Name("Work".to_string()));
        assert_eq!(req.settings.backup_type, BackupType::Increment);
        assert!(req.settings.changes_only);

        config.backup.source = None;
        let req = BackupRequest::from_config(&config, today());
        assert_eq!(req.source, SourceSelector::Id("root".to_string()));
    }
}
