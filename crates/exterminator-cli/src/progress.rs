use exterminator_core::ProgressReporter;
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif progress bars.
///
/// - Scan phase: bar over catalog directories
/// - Delete phase: bar over selected files
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

    fn counting_bar(total: usize, label: &str) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let template = format!("  {{spinner:.cyan}} {label} [{{bar:30.cyan/dim}}] {{pos}}/{{len}}");
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS);
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, directories: usize) {
        self.set_bar(Self::counting_bar(directories, "Scanning"));
    }

    fn on_directory_scanned(&self, _directory: &Path, _matches: usize) {
        self.with_bar(|pb| pb.inc(1));
    }

    fn on_scan_complete(&self, files: usize, total_bytes: u64, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} items, {} in {:.2}s",
            files,
            HumanBytes(total_bytes),
            duration_secs
        );
    }

    fn on_delete_start(&self, total: usize) {
        self.set_bar(Self::counting_bar(total, "Deleting"));
    }

    fn on_file_deleted(&self, done: usize, _total: usize) {
        self.with_bar(|pb| pb.set_position(done as u64));
    }

    fn on_delete_complete(&self, succeeded: usize, failed: usize, skipped: usize) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Deletion complete: {} trashed, {} failed, {} skipped",
            succeeded, failed, skipped
        );
    }

    fn on_restore_complete(&self, restored: usize, failed: usize, not_found: usize) {
        eprintln!(
            "  \x1b[32m✓\x1b[0m Restore complete: {} restored, {} failed, {} no longer in trash",
            restored, failed, not_found
        );
    }
}
