//! Registration and status transitions for catalogued resources.
//!
//! Every transition is a single store update keyed on the resource id, and the
//! in-memory [`Resource`] is brought in line with the row afterwards. An id that no
//! longer exists surfaces as [`Error::ResourceNotFound`].

use crate::error::{Error, Result};
use crate::hasher;
use crate::retry::{self, RetryDecision};
use crate::storage::{Database, Resource};
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// Filesystem facts about one path, gathered without touching the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSnapshot {
    pub size: i64,
    pub last_modified: DateTime<Utc>,
    pub is_directory: bool,
    /// `None` for directories.
    pub checksum: Option<String>,
}

impl FileSnapshot {
    pub fn read(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        let is_directory = metadata.is_dir();
        let checksum = if is_directory {
            None
        } else {
            Some(hasher::file_checksum(path)?)
        };
        Ok(Self {
            size: metadata.len() as i64,
            last_modified: DateTime::<Utc>::from(metadata.modified()?),
            is_directory,
            checksum,
        })
    }
}

/// Catalogue `path` under `remote_name`. Files start queued, directories never are.
pub fn register(db: &Database, path: &Path, remote_name: &str) -> Result<Resource> {
    let snapshot = FileSnapshot::read(path)?;
    register_snapshot(db, &snapshot, remote_name)
}

pub fn register_snapshot(
    db: &Database,
    snapshot: &FileSnapshot,
    remote_name: &str,
) -> Result<Resource> {
    let mut resource = Resource {
        id: 0,
        filename: remote_name.to_string(),
        size: snapshot.size,
        last_modified: snapshot.last_modified,
        add_date: Utc::now(),
        last_synchronized: None,
        in_progress: false,
        queued: !snapshot.is_directory,
        times_failed: 0,
        checksum: if snapshot.is_directory {
            None
        } else {
            snapshot.checksum.clone()
        },
        is_directory: snapshot.is_directory,
    };

    resource.id = match db.insert_resource(&resource) {
        Ok(id) => id,
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            return Err(Error::DuplicateResource(remote_name.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    debug!(
        "Registered {} (id {}, directory: {})",
        resource.filename, resource.id, resource.is_directory
    );
    Ok(resource)
}

/// Re-read a changed path into an existing resource and put it back in the queue
/// with a clean failure count. Directories only get their size and mtime refreshed.
pub fn refresh(db: &Database, resource: &mut Resource, path: &Path) -> Result<()> {
    let snapshot = FileSnapshot::read(path)?;
    refresh_snapshot(db, resource, &snapshot)
}

pub fn refresh_snapshot(
    db: &Database,
    resource: &mut Resource,
    snapshot: &FileSnapshot,
) -> Result<()> {
    // a resource can't change kind; a path that swapped file/dir keeps its original one
    let checksum = if resource.is_directory {
        None
    } else {
        snapshot.checksum.as_deref()
    };
    if db.update_file_details(resource.id, snapshot.size, snapshot.last_modified, checksum)? == 0
    {
        return Err(Error::ResourceNotFound(resource.id));
    }
    resource.size = snapshot.size;
    resource.last_modified = snapshot.last_modified;
    resource.checksum = checksum.map(str::to_string);

    if !resource.is_directory {
        db.requeue_resource(resource.id)?;
        resource.queued = true;
        resource.times_failed = 0;
        debug!("Requeued changed resource {}", resource.filename);
    }
    Ok(())
}

/// Mark the start of a sync attempt. Touches nothing but `in_progress`.
pub fn start_progress(db: &Database, resource: &mut Resource) -> Result<()> {
    if db.mark_in_progress(resource.id)? == 0 {
        return Err(Error::ResourceNotFound(resource.id));
    }
    resource.in_progress = true;
    Ok(())
}

/// Atomically take a queued resource for a sync attempt.
///
/// Returns `false` when the row is no longer queued or another worker already holds it;
/// the caller must then leave the resource alone. On `true` the effect is that of
/// [`start_progress`].
pub fn claim(db: &Database, resource: &mut Resource) -> Result<bool> {
    if db.claim_resource(resource.id)? == 1 {
        resource.in_progress = true;
        return Ok(true);
    }
    if !db.resource_exists(resource.id)? {
        return Err(Error::ResourceNotFound(resource.id));
    }
    debug!("Resource {} already claimed or dequeued", resource.filename);
    Ok(false)
}

pub fn report_success(db: &Database, resource: &mut Resource) -> Result<()> {
    let now = Utc::now();
    if db.mark_synchronized(resource.id, now)? == 0 {
        return Err(Error::ResourceNotFound(resource.id));
    }
    resource.in_progress = false;
    resource.queued = false;
    resource.times_failed = 0;
    resource.last_synchronized = Some(now);
    debug!("Synchronized {}", resource.filename);
    Ok(())
}

/// Record a failed attempt. `max_retries` is read by the caller at each report.
pub fn report_failure(
    db: &Database,
    resource: &mut Resource,
    max_retries: u32,
) -> Result<RetryDecision> {
    let (times_failed, queued) = db
        .record_failure(resource.id, |times_failed| {
            retry::will_requeue(times_failed, max_retries)
        })?
        .ok_or(Error::ResourceNotFound(resource.id))?;

    resource.times_failed = times_failed;
    resource.in_progress = false;
    resource.queued = queued;

    if queued {
        debug!(
            "Requeued {} after failure {}/{}",
            resource.filename, times_failed, max_retries
        );
        Ok(RetryDecision::Requeue)
    } else {
        warn!(
            "Giving up on {} after {} failed attempts",
            resource.filename, times_failed
        );
        Ok(RetryDecision::Stall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_snapshot_of_directory_has_no_checksum() {
        let dir = tempdir().unwrap();
        let snapshot = FileSnapshot::read(dir.path()).unwrap();
        assert!(snapshot.is_directory);
        assert!(snapshot.checksum.is_none());
    }

    #[test]
    fn test_snapshot_of_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"0123456789").unwrap();

        let snapshot = FileSnapshot::read(&path).unwrap();
        assert!(!snapshot.is_directory);
        assert_eq!(snapshot.size, 10);
        assert_eq!(snapshot.checksum, Some(hasher::xxhash::hash_data(b"0123456789")));
    }

    #[test]
    fn test_register_directory_snapshot_drops_stray_checksum() {
        let db = Database::open_in_memory().unwrap();
        let snapshot = FileSnapshot {
            size: 0,
            last_modified: Utc::now(),
            is_directory: true,
            checksum: Some("ignored".to_string()),
        };
        let resource = register_snapshot(&db, &snapshot, "dir").unwrap();
        assert!(resource.checksum.is_none());
        assert!(!resource.queued);
    }

    #[test]
    fn test_transitions_on_missing_row() {
        let db = Database::open_in_memory().unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, b"abc").unwrap();
        let mut resource = register(&db, &path, "a.txt").unwrap();
        db.truncate_all().unwrap();

        assert!(matches!(
            start_progress(&db, &mut resource),
            Err(Error::ResourceNotFound(_))
        ));
        assert!(matches!(
            claim(&db, &mut resource),
            Err(Error::ResourceNotFound(_))
        ));
        assert!(matches!(
            report_success(&db, &mut resource),
            Err(Error::ResourceNotFound(_))
        ));
        assert!(matches!(
            report_failure(&db, &mut resource, 3),
            Err(Error::ResourceNotFound(_))
        ));
    }
}
