use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::{DeletionError, PrivilegedError};
use crate::model::{DeletionOutcome, DiscoveredFile};
use crate::platform;
use crate::progress::ProgressReporter;
use crate::removal::privileged::PrivilegedDeleter;
use crate::removal::trash::TrashStore;

/// Moves a selection of discovered files to the trash, best-effort per file.
pub struct Deleter {
    trash: TrashStore,
    privileged: Option<PrivilegedDeleter>,
}

impl Deleter {
    pub fn new(trash: TrashStore) -> Self {
        Self {
            trash,
            privileged: None,
        }
    }

    pub fn with_privileged(mut self, privileged: PrivilegedDeleter) -> Self {
        self.privileged = Some(privileged);
        self
    }

    pub fn trash(&self) -> &TrashStore {
        &self.trash
    }

    /// User-writable files are trashed here one at a time. Elevated files go to
    /// the privileged path when `include_elevated` is set, otherwise they are
    /// reported as skipped and left alone.
    pub fn delete(
        &self,
        files: &[DiscoveredFile],
        include_elevated: bool,
        reporter: &dyn ProgressReporter,
    ) -> DeletionOutcome {
        let (elevated_files, user_files): (Vec<&DiscoveredFile>, Vec<&DiscoveredFile>) =
            files.iter().partition(|f| f.requires_elevated_privilege);

        reporter.on_delete_start(files.len());
        let mut outcome = DeletionOutcome::default();

        for (index, file) in user_files.iter().enumerate() {
            match self.trash_one(&file.path) {
                Ok(()) => outcome.succeeded.push((*file).clone()),
                Err(err) => {
                    warn!("{}", err);
                    outcome.failed.push(((*file).clone(), err));
                }
            }
            reporter.on_file_deleted(index + 1, files.len());
        }

        if !include_elevated {
            outcome
                .skipped_privileged
                .extend(elevated_files.into_iter().cloned());
        } else if !elevated_files.is_empty() {
            let elevated: Vec<DiscoveredFile> = elevated_files.into_iter().cloned().collect();
            outcome = outcome.merge(self.delete_elevated(elevated));
            reporter.on_file_deleted(files.len(), files.len());
        }

        reporter.on_delete_complete(
            outcome.total_deleted(),
            outcome.total_failed(),
            outcome.total_skipped(),
        );
        info!(
            "Deletion finished: {} succeeded, {} failed, {} skipped",
            outcome.total_deleted(),
            outcome.total_failed(),
            outcome.total_skipped()
        );
        outcome
    }

    /// A delegation-level failure marks every elevated file failed with that cause.
    fn delete_elevated(&self, files: Vec<DiscoveredFile>) -> DeletionOutcome {
        let result = match &self.privileged {
            Some(privileged) => privileged.delete_with_privileges(&files),
            None => Err(PrivilegedError::AuthorizationFailed(
                "no privileged helper is configured".to_string(),
            )),
        };

        match result {
            Ok(privileged_outcome) => privileged_outcome.into(),
            Err(err) => {
                warn!("Privileged deletion failed for the whole batch: {}", err);
                DeletionOutcome {
                    failed: files
                        .into_iter()
                        .map(|f| (f, DeletionError::Privileged(err.clone())))
                        .collect(),
                    ..Default::default()
                }
            }
        }
    }

    fn trash_one(&self, path: &Path) -> Result<(), DeletionError> {
        if !platform::entry_exists(path) {
            return Err(DeletionError::VerificationFailed {
                path: path.to_path_buf(),
                reason: "file no longer exists".to_string(),
            });
        }

        let destination = self
            .trash
            .move_to_trash(path)
            .map_err(|source| DeletionError::TrashFailed {
                path: path.to_path_buf(),
                source,
            })?;

        if !platform::entry_exists(&destination) {
            return Err(DeletionError::VerificationFailed {
                path: path.to_path_buf(),
                reason: format!("{} is missing after the move", destination.display()),
            });
        }
        if platform::entry_exists(path) {
            return Err(DeletionError::VerificationFailed {
                path: path.to_path_buf(),
                reason: "original still present after the move".to_string(),
            });
        }

        debug!("Trashed {} -> {}", path.display(), destination.display());
        Ok(())
    }
}
