use crate::error::Error;
use crate::storage::Resource;

/// Trait for reporting scan and drain progress.
///
/// The CLI implements it with indicatif progress bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_progress(&self, _entries_checked: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _total_entries: usize, _duration_secs: f64) {}
    fn on_drain_start(&self, _pending: usize) {}
    fn on_resource_synced(&self, _resource: &Resource) {}
    fn on_resource_failed(&self, _resource: &Resource, _error: &Error) {}
    fn on_drain_complete(&self, _synced: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
