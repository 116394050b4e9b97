use backup_index_core::{Error, ProgressReporter, Resource};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan phase: spinner (entry count unknown upfront)
/// - Drain phase: progress bar sized to the pending count
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn set_bar(&self, pb: ProgressBar) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                f(pb);
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message("Scanning backup path...");
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_progress(&self, entries_checked: usize, _current_path: &str) {
        self.with_bar(|pb| {
            pb.set_message(format!("Scanning... {} entries checked", entries_checked))
        });
    }

    fn on_scan_complete(&self, total_entries: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} entries in {:.2}s",
            total_entries, duration_secs
        );
    }

    fn on_drain_start(&self, pending: usize) {
        let pb = ProgressBar::new(pending as u64);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} Uploading [{bar:30.cyan/dim}] {pos}/{len} files ({eta} remaining)",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(std::time::Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_resource_synced(&self, _resource: &Resource) {
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_resource_failed(&self, resource: &Resource, error: &Error) {
        self.with_bar(|pb| {
            pb.println(format!("  \x1b[31m✗\x1b[0m {}: {}", resource.filename, error));
            pb.inc(1);
        });
    }

    fn on_drain_complete(&self, synced: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Sync complete: {} uploaded, {} failed in {:.2}s",
            synced, failed, duration_secs
        );
    }
}
