#[cfg(unix)]
pub mod unix;

use std::fs::Metadata;
use std::path::{Path, PathBuf};

pub fn default_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
}

/// The per-user recoverable trash location.
#[cfg(target_os = "macos")]
pub fn default_trash_dir(home: &Path) -> PathBuf {
    home.join(".Trash")
}

#[cfg(not(target_os = "macos"))]
pub fn default_trash_dir(home: &Path) -> PathBuf {
    // Not the freedesktop trash: items there need a matching .trashinfo.
    home.join(".local/share/app-exterminator/Trash")
}

pub fn default_history_file(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library/Application Support/AppExterminator/deletion_history.json")
    } else {
        home.join(".local/share/app-exterminator/deletion_history.json")
    }
}

#[cfg(unix)]
pub fn is_writable(path: &Path) -> bool {
    unix::is_writable(path)
}

#[cfg(not(unix))]
pub fn is_writable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false)
}

/// Bytes allocated on disk for one entry.
#[cfg(unix)]
pub fn allocated_size(metadata: &Metadata) -> u64 {
    unix::allocated_size(metadata)
}

#[cfg(not(unix))]
pub fn allocated_size(metadata: &Metadata) -> u64 {
    metadata.len()
}

/// Existence check that also sees dangling symlinks.
pub fn entry_exists(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok()
}
