use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::RestoreError;
use crate::model::{DeletedFileDescriptor, DeletionRecord, RestoreOutcome};
use crate::platform;
use crate::progress::ProgressReporter;
use crate::removal::trash::split_name;

/// Moves previously trashed files back to where they came from.
#[derive(Debug, Clone)]
pub struct TrashRestorer {
    trash_dir: PathBuf,
}

impl TrashRestorer {
    pub fn new(trash_dir: impl Into<PathBuf>) -> Self {
        Self {
            trash_dir: trash_dir.into(),
        }
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    /// Each descriptor is independent; one failure never stops the rest.
    pub fn restore(&self, files: &[DeletedFileDescriptor], reporter: &dyn ProgressReporter) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();

        for descriptor in files {
            match self.restore_one(descriptor) {
                Ok(()) => outcome.restored.push(descriptor.clone()),
                Err(RestoreError::FileNotInTrash(path)) => {
                    debug!("{} is no longer in the trash", path.display());
                    outcome.not_found_in_trash.push(descriptor.clone());
                }
                Err(err) => {
                    warn!("{}", err);
                    outcome.failed.push((descriptor.clone(), err));
                }
            }
        }

        reporter.on_restore_complete(
            outcome.total_restored(),
            outcome.total_failed(),
            outcome.total_not_in_trash(),
        );
        info!(
            "Restore finished: {} restored, {} failed, {} not in trash",
            outcome.total_restored(),
            outcome.total_failed(),
            outcome.total_not_in_trash()
        );
        outcome
    }

    pub fn restore_record(&self, record: &DeletionRecord, reporter: &dyn ProgressReporter) -> RestoreOutcome {
        self.restore(&record.deleted_files, reporter)
    }

    pub fn restore_one(&self, descriptor: &DeletedFileDescriptor) -> Result<(), RestoreError> {
        let original = descriptor.path();
        let trashed = self
            .find_in_trash(original)
            .ok_or_else(|| RestoreError::FileNotInTrash(original.to_path_buf()))?;

        if platform::entry_exists(original) {
            return Err(RestoreError::DestinationOccupied(original.to_path_buf()));
        }

        if let Some(parent) = original.parent() {
            if !parent.is_dir() {
                fs::create_dir_all(parent)
                    .map_err(|_| RestoreError::ParentDirectoryMissing(original.to_path_buf()))?;
            }
        }

        fs::rename(&trashed, original).map_err(|e| match e.kind() {
            io::ErrorKind::PermissionDenied => RestoreError::PermissionDenied(original.to_path_buf()),
            _ => RestoreError::MoveFailed {
                path: original.to_path_buf(),
                reason: e.to_string(),
            },
        })?;

        debug!("Restored {} from {}", original.display(), trashed.display());
        Ok(())
    }

    pub fn can_restore(&self, descriptor: &DeletedFileDescriptor) -> bool {
        self.find_in_trash(descriptor.path()).is_some()
    }

    pub fn can_restore_any(&self, files: &[DeletedFileDescriptor]) -> bool {
        files.iter().any(|f| self.can_restore(f))
    }

    /// The trash entry holding `original`: the same name if present, otherwise
    /// the `"stem N"` collision variant with the highest `N`.
    pub fn find_in_trash(&self, original: &Path) -> Option<PathBuf> {
        let file_name = original.file_name()?.to_string_lossy().into_owned();
        let exact = self.trash_dir.join(&file_name);
        if platform::entry_exists(&exact) {
            return Some(exact);
        }

        let (stem, ext) = split_name(&file_name);
        let entries = fs::read_dir(&self.trash_dir).ok()?;

        let mut best: Option<(u32, PathBuf)> = None;
        for entry in entries.filter_map(|e| e.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            let (candidate_stem, candidate_ext) = split_name(&name);
            if candidate_ext != ext {
                continue;
            }

            let rank = if candidate_stem == stem {
                0
            } else {
                match collision_counter(&candidate_stem, &stem) {
                    Some(n) => n,
                    None => continue,
                }
            };
            if best.as_ref().map_or(true, |(current, _)| rank > *current) {
                best = Some((rank, entry.path()));
            }
        }

        best.map(|(_, path)| path)
    }
}

/// `n` when `candidate` is `"{stem} {n}"`.
fn collision_counter(candidate: &str, stem: &str) -> Option<u32> {
    let suffix = candidate.strip_prefix(stem)?.strip_prefix(' ')?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}
