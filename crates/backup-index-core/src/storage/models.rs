use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// A catalogued file or directory under the backup root.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: i64,
    /// Name on the remote side; path relative to the backup root, `/`-separated.
    pub filename: String,
    pub size: i64,
    pub last_modified: DateTime<Utc>,
    pub add_date: DateTime<Utc>,
    pub last_synchronized: Option<DateTime<Utc>>,
    pub in_progress: bool,
    pub queued: bool,
    pub times_failed: u32,
    pub checksum: Option<String>,
    pub is_directory: bool,
}

impl Resource {
    /// Location of the resource on the local disk.
    pub fn abs_path(&self, backup_path: &Path) -> PathBuf {
        self.filename
            .split('/')
            .fold(backup_path.to_path_buf(), |path, part| path.join(part))
    }

    pub fn state(&self) -> SyncState {
        if self.is_directory {
            SyncState::Directory
        } else if self.in_progress {
            SyncState::InProgress
        } else if self.queued {
            SyncState::Queued
        } else if self.times_failed > 0 {
            SyncState::Stalled
        } else if self.last_synchronized.is_some() {
            SyncState::Synced
        } else {
            SyncState::Idle
        }
    }
}

/// Derived view over the status fields of a [`Resource`]. Not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Directory,
    Queued,
    InProgress,
    Synced,
    /// Dequeued after exhausting the retry ceiling; waits for a rescan.
    Stalled,
    Idle,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Queued => "queued",
            Self::InProgress => "in-progress",
            Self::Synced => "synced",
            Self::Stalled => "stalled",
            Self::Idle => "idle",
        }
    }
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filtered, ordered view of the catalog, walked by the chunked iterator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceFilter {
    /// Every resource, ordered by filename.
    All,
    /// The sync queue: resources with `queued = true`.
    Pending,
    /// Files dequeued after exhausting their retries, ordered by filename.
    Stalled,
}

impl ResourceFilter {
    pub(crate) fn where_clause(&self) -> &'static str {
        match self {
            Self::All => "",
            Self::Pending => "WHERE queued = 1",
            Self::Stalled => {
                "WHERE queued = 0 AND in_progress = 0 AND is_directory = 0 AND times_failed > 0"
            }
        }
    }

    pub(crate) fn order_clause(&self) -> &'static str {
        match self {
            Self::All | Self::Stalled => "ORDER BY filename",
            // queue order is unspecified; rowid keeps it stable for a static table
            Self::Pending => "ORDER BY id",
        }
    }
}

/// Resource counts per derived state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSummary {
    pub total: i64,
    pub directories: i64,
    pub queued: i64,
    pub in_progress: i64,
    pub synced: i64,
    pub stalled: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_resource() -> Resource {
        let now = Utc::now();
        Resource {
            id: 1,
            filename: "docs/a.txt".to_string(),
            size: 10,
            last_modified: now,
            add_date: now,
            last_synchronized: None,
            in_progress: false,
            queued: true,
            times_failed: 0,
            checksum: Some("abc".to_string()),
            is_directory: false,
        }
    }

    #[test]
    fn test_abs_path_joins_components() {
        let resource = file_resource();
        let path = resource.abs_path(Path::new("/backup"));
        assert_eq!(path, Path::new("/backup").join("docs").join("a.txt"));
    }

    #[test]
    fn test_state_derivation() {
        let mut resource = file_resource();
        assert_eq!(resource.state(), SyncState::Queued);

        resource.in_progress = true;
        assert_eq!(resource.state(), SyncState::InProgress);

        resource.in_progress = false;
        resource.queued = false;
        resource.times_failed = 3;
        assert_eq!(resource.state(), SyncState::Stalled);

        resource.times_failed = 0;
        resource.last_synchronized = Some(Utc::now());
        assert_eq!(resource.state(), SyncState::Synced);

        resource.is_directory = true;
        assert_eq!(resource.state(), SyncState::Directory);
    }
}
