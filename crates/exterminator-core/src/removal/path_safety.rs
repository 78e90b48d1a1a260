//! Validation of paths handed to the privileged helper.
//!
//! Deletion targets come from enumerating user-writable directories, so a
//! hostile file name must never reach an elevated process unchecked. A path
//! passes only if it:
//!
//! - contains no control characters (newlines included)
//! - is absolute and has no `..` segment
//! - still exists, with symlinks in its parent chain resolved
//! - lies strictly below one of the allowed prefixes

use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::PathRejection;

#[derive(Debug, Clone)]
pub struct PathSafetyValidator {
    allowed_prefixes: Vec<PathBuf>,
}

impl PathSafetyValidator {
    pub fn new(allowed_prefixes: Vec<PathBuf>) -> Self {
        Self { allowed_prefixes }
    }

    /// `~/Library`, `~/Applications`, `/Library` and `/Applications`.
    pub fn system_default(home: &Path) -> Self {
        Self::new(vec![
            home.join("Library"),
            home.join("Applications"),
            PathBuf::from("/Library"),
            PathBuf::from("/Applications"),
        ])
    }

    pub fn allowed_prefixes(&self) -> &[PathBuf] {
        &self.allowed_prefixes
    }

    /// Allowed prefixes with symlinks resolved where they exist.
    pub fn resolved_prefixes(&self) -> Vec<PathBuf> {
        self.allowed_prefixes
            .iter()
            .map(|prefix| prefix.canonicalize().unwrap_or_else(|_| prefix.clone()))
            .collect()
    }

    /// Returns the resolved path to operate on.
    ///
    /// The final component is kept as-is so a symlink is acted on itself,
    /// never on whatever it points at.
    pub fn validate(&self, path: &Path) -> Result<PathBuf, PathRejection> {
        if path.to_string_lossy().chars().any(char::is_control) {
            return Err(PathRejection::ControlCharacter);
        }
        if !path.is_absolute() {
            return Err(PathRejection::NotAbsolute);
        }
        if has_traversal(path) {
            return Err(PathRejection::Traversal);
        }

        let (parent, name) = match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => (parent, name),
            _ => return Err(PathRejection::OutsideAllowedPrefixes),
        };

        let resolved_parent = parent.canonicalize().map_err(rejection_for)?;
        let resolved = resolved_parent.join(name);
        if has_traversal(&resolved) {
            return Err(PathRejection::Traversal);
        }

        if std::fs::symlink_metadata(&resolved).is_err() {
            return Err(PathRejection::Missing);
        }

        if !self.is_allowed(&resolved) {
            return Err(PathRejection::OutsideAllowedPrefixes);
        }

        Ok(resolved)
    }

    fn is_allowed(&self, resolved: &Path) -> bool {
        self.resolved_prefixes()
            .iter()
            .any(|prefix| resolved.starts_with(prefix) && resolved != prefix)
    }
}

fn has_traversal(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::ParentDir))
}

fn rejection_for(err: io::Error) -> PathRejection {
    if err.kind() == io::ErrorKind::NotFound {
        PathRejection::Missing
    } else {
        PathRejection::Unresolvable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn validator_for(root: &Path) -> PathSafetyValidator {
        PathSafetyValidator::new(vec![root.join("Library")])
    }

    #[test]
    fn test_accepts_existing_path_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Library/Caches/com.acme.widget");
        fs::create_dir_all(&target).unwrap();

        let resolved = validator_for(dir.path()).validate(&target).unwrap();
        assert!(resolved.ends_with("Library/Caches/com.acme.widget"));
    }

    #[test]
    fn test_rejects_traversal_before_touching_disk() {
        let validator = PathSafetyValidator::new(vec![PathBuf::from("/tmp")]);
        assert_eq!(
            validator.validate(Path::new("/tmp/../etc/passwd")),
            Err(PathRejection::Traversal)
        );
    }

    #[test]
    fn test_rejects_paths_outside_prefixes_even_if_present() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("var/db/secret");
        fs::create_dir_all(outside.parent().unwrap()).unwrap();
        fs::write(&outside, b"secret").unwrap();
        fs::create_dir_all(dir.path().join("Library")).unwrap();

        assert_eq!(
            validator_for(dir.path()).validate(&outside),
            Err(PathRejection::OutsideAllowedPrefixes)
        );

        let system = PathSafetyValidator::system_default(Path::new("/Users/me"));
        assert!(system.validate(Path::new("/var/db/secret")).is_err());
    }

    #[test]
    fn test_rejects_prefix_itself() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Library")).unwrap();
        assert_eq!(
            validator_for(dir.path()).validate(&dir.path().join("Library")),
            Err(PathRejection::OutsideAllowedPrefixes)
        );
    }

    #[test]
    fn test_rejects_control_characters_and_relative_paths() {
        let validator = PathSafetyValidator::new(vec![PathBuf::from("/Library")]);
        assert_eq!(
            validator.validate(Path::new("/Library/evil\nname")),
            Err(PathRejection::ControlCharacter)
        );
        assert_eq!(
            validator.validate(Path::new("Library/Caches")),
            Err(PathRejection::NotAbsolute)
        );
    }

    #[test]
    fn test_rejects_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Library")).unwrap();
        assert_eq!(
            validator_for(dir.path()).validate(&dir.path().join("Library/gone.plist")),
            Err(PathRejection::Missing)
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_parent_escaping_prefix_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let library = dir.path().join("Library");
        let outside = dir.path().join("outside");
        fs::create_dir_all(&library).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("victim"), b"x").unwrap();
        std::os::unix::fs::symlink(&outside, library.join("Caches")).unwrap();

        assert_eq!(
            validator_for(dir.path()).validate(&library.join("Caches/victim")),
            Err(PathRejection::OutsideAllowedPrefixes)
        );
    }
}
