//! The sync queue: catalog rows with `queued = true`, consumed through the pending-sync
//! chunked listing. There is no separate queue table, so queue membership can never
//! drift from the catalog.

use crate::catalog;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::remote::RemoteStore;
use crate::retry::RetryDecision;
use crate::storage::{Database, ResourceFilter};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub synced: usize,
    /// Failed and requeued.
    pub failed: usize,
    /// Failed and dequeued at the retry ceiling.
    pub stalled: usize,
    /// Claimed by another worker, or no longer queued when its page was read.
    pub skipped: usize,
}

pub fn pending_count(db: &Database) -> Result<usize> {
    Ok(db.count_resources(ResourceFilter::Pending)?)
}

/// Release resources left `in_progress` by an attempt that never reported back, so the
/// next drain can claim them again and the scanner stops skipping them.
///
/// Must only run when this process is the catalog's sole drainer: a live claim held by
/// another worker would be released too.
pub fn recover_interrupted(db: &Database) -> Result<usize> {
    let released = db.reset_in_progress()?;
    if released > 0 {
        warn!("Released {} resources left in progress by an interrupted sync", released);
    }
    Ok(released)
}

/// Make one pass over the queue, pushing each resource through `store`.
///
/// Every resource is claimed before transfer, so concurrent drainers on the same
/// catalog never transfer the same row at once. Being a single offset-paged pass, it can
/// miss rows that shift between pages; those stay queued for the next pass.
pub fn drain(
    db: &Database,
    store: &dyn RemoteStore,
    backup_path: &Path,
    chunk_size: usize,
    max_retries: u32,
    reporter: &dyn ProgressReporter,
) -> Result<DrainStats> {
    let start = Instant::now();
    let groups = db.pending_sync_groups(chunk_size)?;
    reporter.on_drain_start(groups.total());

    let mut stats = DrainStats::default();
    for group in groups {
        for mut resource in group? {
            if !catalog::claim(db, &mut resource)? {
                stats.skipped += 1;
                continue;
            }

            match store.upload(&resource.abs_path(backup_path), &resource.filename) {
                Ok(()) => {
                    catalog::report_success(db, &mut resource)?;
                    stats.synced += 1;
                    reporter.on_resource_synced(&resource);
                }
                Err(err) => {
                    debug!("Transfer of {} failed: {}", resource.filename, err);
                    match catalog::report_failure(db, &mut resource, max_retries)? {
                        RetryDecision::Requeue => stats.failed += 1,
                        RetryDecision::Stall => stats.stalled += 1,
                    }
                    reporter.on_resource_failed(&resource, &err);
                }
            }
        }
    }

    let duration = start.elapsed();
    reporter.on_drain_complete(
        stats.synced,
        stats.failed + stats.stalled,
        duration.as_secs_f64(),
    );
    info!(
        "Drain finished in {:.2}s: {} synced, {} requeued, {} stalled, {} skipped",
        duration.as_secs_f64(),
        stats.synced,
        stats.failed,
        stats.stalled,
        stats.skipped,
    );
    Ok(stats)
}
