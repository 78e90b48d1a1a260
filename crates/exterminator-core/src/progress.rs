use std::path::Path;

/// Trait for reporting scan, deletion and restore progress.
///
/// The CLI implements it with indicatif; hosts that only want the terminal
/// result use [`SilentReporter`]. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _directories: usize) {}
    fn on_directory_scanned(&self, _directory: &Path, _matches: usize) {}
    fn on_scan_complete(&self, _files: usize, _total_bytes: u64, _duration_secs: f64) {}
    fn on_delete_start(&self, _total: usize) {}
    fn on_file_deleted(&self, _done: usize, _total: usize) {}
    fn on_delete_complete(&self, _succeeded: usize, _failed: usize, _skipped: usize) {}
    fn on_restore_complete(&self, _restored: usize, _failed: usize, _not_found: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
