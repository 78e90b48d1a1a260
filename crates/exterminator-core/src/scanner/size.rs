use std::fs;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

use crate::platform;

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Logical length for files; allocated bytes summed over a directory tree.
///
/// Missing or unreadable entries count as zero.
pub fn entry_size(path: &Path) -> u64 {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => directory_size(path),
        Ok(metadata) => metadata.len(),
        Err(_) => 0,
    }
}

/// Sequential walk; hidden entries and everything beneath them are skipped.
pub fn directory_size(root: &Path) -> u64 {
    WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter_map(|e| e.metadata().ok())
        .map(|m| platform::allocated_size(&m))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size_is_logical_length() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.plist");
        fs::write(&file, vec![0u8; 1234]).unwrap();
        assert_eq!(entry_size(&file), 1234);
    }

    #[test]
    fn test_directory_size_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("cache");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("nested/blob"), vec![1u8; 10_000]).unwrap();
        fs::write(root.join(".hidden/blob"), vec![1u8; 50_000]).unwrap();
        fs::write(root.join(".DS_Store"), vec![1u8; 50_000]).unwrap();

        let visible_only = directory_size(&root);
        let nested = platform::allocated_size(&fs::metadata(root.join("nested/blob")).unwrap());
        assert_eq!(visible_only, nested);
        assert_eq!(entry_size(&root), visible_only);
    }

    #[test]
    fn test_missing_path_is_zero() {
        assert_eq!(entry_size(Path::new("/definitely/not/here")), 0);
    }
}
