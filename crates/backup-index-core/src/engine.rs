use crate::config::AppConfig;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::queue::{self, DrainStats};
use crate::remote::{LocalDirStore, RemoteStore};
use crate::scanner::{self, ScanStats};
use crate::storage::Database;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Wires the catalog to the configured backup root and remote store.
///
/// The engine assumes it is the only drainer of its catalog: `sync` and `run` first
/// release claims left behind by an interrupted attempt.
pub struct SyncEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct SyncResult {
    pub scan_duration: Duration,
    pub drain_duration: Duration,
    pub scan: ScanStats,
    pub drain: DrainStats,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RestoreStats {
    pub files: usize,
    pub directories: usize,
    /// Never synchronized, so nothing to fetch.
    pub skipped: usize,
    /// Synchronized but the download failed.
    pub failed: usize,
}

impl SyncEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn open_database(&self) -> Result<Database> {
        debug!("Opening catalog at {}", self.config.database_path);
        Ok(Database::open(&self.config.database_path)?)
    }

    pub fn remote_store(&self) -> LocalDirStore {
        LocalDirStore::new(&self.config.remote.root)
    }

    pub fn scan(&self, reporter: &dyn ProgressReporter) -> Result<ScanStats> {
        let db = self.open_database()?;
        self.scan_into(&db, reporter)
    }

    fn scan_into(&self, db: &Database, reporter: &dyn ProgressReporter) -> Result<ScanStats> {
        scanner::scan(
            db,
            Path::new(&self.config.backup_path),
            &self.config.ignore_patterns,
            reporter,
        )
    }

    pub fn sync(
        &self,
        store: &dyn RemoteStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<DrainStats> {
        let db = self.open_database()?;
        queue::recover_interrupted(&db)?;
        self.drain(&db, store, reporter)
    }

    fn drain(
        &self,
        db: &Database,
        store: &dyn RemoteStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<DrainStats> {
        queue::drain(
            db,
            store,
            Path::new(&self.config.backup_path),
            self.config.chunk_size,
            self.config.max_upload_retries,
            reporter,
        )
    }

    /// Scan, then drain whatever the scan queued.
    pub fn run(
        &self,
        store: &dyn RemoteStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<SyncResult> {
        let db = self.open_database()?;
        queue::recover_interrupted(&db)?;

        info!("Scanning {}...", self.config.backup_path);
        let scan_start = Instant::now();
        let scan = self.scan_into(&db, reporter)?;
        let scan_duration = scan_start.elapsed();

        info!("Synchronizing queued resources...");
        let drain_start = Instant::now();
        let drain = self.drain(&db, store, reporter)?;
        let drain_duration = drain_start.elapsed();

        Ok(SyncResult {
            scan_duration,
            drain_duration,
            scan,
            drain,
        })
    }

    /// Copy every synchronized file from `store` into `target`, recreating directories.
    pub fn restore(&self, store: &dyn RemoteStore, target: &Path) -> Result<RestoreStats> {
        let db = self.open_database()?;
        restore(&db, store, target, self.config.chunk_size)
    }
}

pub fn restore(
    db: &Database,
    store: &dyn RemoteStore,
    target: &Path,
    chunk_size: usize,
) -> Result<RestoreStats> {
    let mut stats = RestoreStats::default();
    for group in db.ordered_groups(chunk_size)? {
        for resource in group? {
            let dest = resource.abs_path(target);
            if resource.is_directory {
                fs::create_dir_all(&dest)?;
                stats.directories += 1;
            } else if resource.last_synchronized.is_some() {
                match store.download(&resource.filename, &dest) {
                    Ok(()) => stats.files += 1,
                    Err(err) => {
                        error!("Error restoring {}: {}", resource.filename, err);
                        stats.failed += 1;
                    }
                }
            } else {
                debug!("Skipping {}, never synchronized", resource.filename);
                stats.skipped += 1;
            }
        }
    }
    info!(
        "Restored {} files and {} directories into {} ({} failed)",
        stats.files,
        stats.directories,
        target.display(),
        stats.failed
    );
    Ok(stats)
}
