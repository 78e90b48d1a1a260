use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::platform;

/// Upper bound on `"name N"` candidates tried before giving up.
pub const MAX_COLLISION_ATTEMPTS: u32 = 1000;

/// Split a file name into stem and extension the way `Path` does.
pub fn split_name(file_name: &str) -> (String, Option<String>) {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

/// `"stem N.ext"`, or `"name N"` when there is no extension.
pub fn collision_name(file_name: &str, counter: u32) -> String {
    match split_name(file_name) {
        (stem, Some(ext)) => format!("{stem} {counter}.{ext}"),
        (stem, None) => format!("{stem} {counter}"),
    }
}

/// First free name in `dir`: the original, then collision names counting from 1.
///
/// Names in `reserved` count as taken; they are claimed earlier in the same batch.
pub fn unique_trash_name(dir: &Path, file_name: &str, reserved: &HashSet<String>) -> Option<String> {
    let is_free = |name: &str| !reserved.contains(name) && !platform::entry_exists(&dir.join(name));

    if is_free(file_name) {
        return Some(file_name.to_string());
    }
    (1..=MAX_COLLISION_ATTEMPTS)
        .map(|n| collision_name(file_name, n))
        .find(|candidate| is_free(candidate))
}

/// The recoverable trash directory for user-writable files.
#[derive(Debug, Clone)]
pub struct TrashStore {
    dir: PathBuf,
}

impl TrashStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Rename `path` into the trash under a collision-free name; returns where it landed.
    pub fn move_to_trash(&self, path: &Path) -> io::Result<PathBuf> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no file name", path.display()),
                )
            })?;

        if !self.dir.is_dir() {
            fs::create_dir_all(&self.dir)?;
        }

        let name = unique_trash_name(&self.dir, &file_name, &HashSet::new()).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free name for {} in {}", file_name, self.dir.display()),
            )
        })?;

        let destination = self.dir.join(name);
        fs::rename(path, &destination)?;
        Ok(destination)
    }
}
