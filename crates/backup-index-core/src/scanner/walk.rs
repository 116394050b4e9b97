use crate::catalog::{self, FileSnapshot};
use crate::error::Result;
use crate::hasher;
use crate::progress::ProgressReporter;
use crate::storage::{Database, Resource};
use glob::Pattern;
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub registered: usize,
    pub refreshed: usize,
    pub unchanged: usize,
    /// Unreadable entries, and resources mid-transfer.
    pub skipped: usize,
}

struct Candidate {
    path: PathBuf,
    name: String,
    existing: Option<Resource>,
}

enum Outcome {
    New(FileSnapshot),
    Changed(FileSnapshot),
    Unchanged,
    Busy,
    Unreadable(io::Error),
}

/// Walk `backup_path` and bring the catalog in line with it.
///
/// New entries are registered, known files whose content no longer matches are
/// refreshed back into the queue, and everything else is left alone. Fingerprinting
/// runs in parallel; catalog writes happen on the calling thread.
pub fn scan(
    db: &Database,
    backup_path: &Path,
    ignore_globs: &[String],
    reporter: &dyn ProgressReporter,
) -> Result<ScanStats> {
    let start = Instant::now();
    reporter.on_scan_start();

    let ignore_patterns = ignore_globs
        .iter()
        .map(|glob| Pattern::new(glob))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut stats = ScanStats::default();
    let mut candidates = Vec::new();

    let walker = WalkDir::new(backup_path)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry.path(), backup_path, &ignore_patterns));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                error!("Error walking {}: {}", backup_path.display(), err);
                stats.skipped += 1;
                continue;
            }
        };
        if entry.path_is_symlink() {
            continue;
        }
        let Some(name) = remote_name(backup_path, entry.path()) else {
            continue;
        };
        reporter.on_scan_progress(candidates.len() + 1, &name);
        let existing = db.find_resource_by_name(&name)?;
        candidates.push(Candidate {
            path: entry.into_path(),
            name,
            existing,
        });
    }

    let outcomes: Vec<Outcome> = candidates.par_iter().map(inspect).collect();

    for (candidate, outcome) in candidates.into_iter().zip(outcomes) {
        match outcome {
            Outcome::New(snapshot) => {
                catalog::register_snapshot(db, &snapshot, &candidate.name)?;
                stats.registered += 1;
            }
            Outcome::Changed(snapshot) => {
                if let Some(mut resource) = candidate.existing {
                    catalog::refresh_snapshot(db, &mut resource, &snapshot)?;
                    stats.refreshed += 1;
                }
            }
            Outcome::Unchanged => stats.unchanged += 1,
            Outcome::Busy => {
                debug!("Skipping {}, transfer in progress", candidate.name);
                stats.skipped += 1;
            }
            Outcome::Unreadable(err) => {
                error!("Error reading {}: {}", candidate.path.display(), err);
                stats.skipped += 1;
            }
        }
    }

    let total = stats.registered + stats.refreshed + stats.unchanged + stats.skipped;
    let duration = start.elapsed();
    reporter.on_scan_complete(total, duration.as_secs_f64());
    info!(
        "Scan of {} finished in {:.2}s: {} new, {} changed, {} unchanged, {} skipped",
        backup_path.display(),
        duration.as_secs_f64(),
        stats.registered,
        stats.refreshed,
        stats.unchanged,
        stats.skipped,
    );
    Ok(stats)
}

fn inspect(candidate: &Candidate) -> Outcome {
    match &candidate.existing {
        None => match FileSnapshot::read(&candidate.path) {
            Ok(snapshot) => Outcome::New(snapshot),
            Err(err) => Outcome::Unreadable(err),
        },
        Some(resource) if resource.in_progress => Outcome::Busy,
        Some(resource) if resource.is_directory => Outcome::Unchanged,
        Some(resource) => {
            if hasher::is_synchronized(&candidate.path, resource.checksum.as_deref()) {
                Outcome::Unchanged
            } else {
                match FileSnapshot::read(&candidate.path) {
                    Ok(snapshot) => Outcome::Changed(snapshot),
                    Err(err) => Outcome::Unreadable(err),
                }
            }
        }
    }
}

fn is_ignored(path: &Path, backup_path: &Path, patterns: &[Pattern]) -> bool {
    let relative = remote_name(backup_path, path);
    patterns.iter().any(|pattern| {
        pattern.matches_path(path)
            || relative
                .as_deref()
                .is_some_and(|name| pattern.matches(name))
    })
}

/// Remote name for `path`: its location under `backup_path`, `/`-separated.
/// `None` for the root itself or paths outside it.
pub fn remote_name(backup_path: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(backup_path).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
