use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("History error: {0}")]
    History(#[from] serde_json::Error),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Privileged(#[from] PrivilegedError),

    #[error("{0}")]
    Other(String),
}

/// Reasons an application identity cannot enter the scan/delete path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{0} is not an application bundle")]
    NotAnAppBundle(PathBuf),

    #[error("The application bundle does not have a valid bundle identifier")]
    MissingBundleIdentifier,

    #[error("{0} is a protected system application and cannot be deleted")]
    ProtectedSystemApp(String),
}

/// Per-file failure recorded in a deletion outcome.
#[derive(Error, Debug)]
pub enum DeletionError {
    #[error("Verification failed for {path}: {reason}")]
    VerificationFailed { path: PathBuf, reason: String },

    #[error("Failed to move {path} to the trash: {source}")]
    TrashFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Privileged(#[from] PrivilegedError),
}

/// Why a path was refused by the privileged path validator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    #[error("path contains control characters")]
    ControlCharacter,

    #[error("path is not absolute")]
    NotAbsolute,

    #[error("path contains a traversal segment")]
    Traversal,

    #[error("path is outside the allowed locations")]
    OutsideAllowedPrefixes,

    #[error("path no longer exists")]
    Missing,

    #[error("path cannot be resolved: {0}")]
    Unresolvable(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedError {
    #[error("Failed to obtain administrator privileges: {0}")]
    AuthorizationFailed(String),

    #[error("Administrator authentication was cancelled")]
    AuthorizationCancelled,

    #[error("Refusing privileged operation on {path}: {reason}")]
    PathValidationFailed { path: PathBuf, reason: PathRejection },

    #[error("Trash directory not found: {0}")]
    TrashDirectoryNotFound(PathBuf),

    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),
}

impl PrivilegedError {
    /// Batch-fatal errors abort the whole privileged call; the rest are per file.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            PrivilegedError::AuthorizationFailed(_)
                | PrivilegedError::AuthorizationCancelled
                | PrivilegedError::TrashDirectoryNotFound(_)
        )
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestoreError {
    #[error("File no longer in Trash: {}", file_name(.0))]
    FileNotInTrash(PathBuf),

    #[error("Original location is occupied: {}", .0.display())]
    DestinationOccupied(PathBuf),

    #[error("Permission denied: {}", .0.display())]
    PermissionDenied(PathBuf),

    #[error("Parent directory missing: {}", parent_of(.0))]
    ParentDirectoryMissing(PathBuf),

    #[error("Failed to restore {}: {reason}", file_name(.path))]
    MoveFailed { path: PathBuf, reason: String },
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn parent_of(path: &std::path::Path) -> String {
    path.parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
