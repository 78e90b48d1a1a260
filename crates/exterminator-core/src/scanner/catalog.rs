use std::path::{Path, PathBuf};

use crate::model::FileCategory;

/// One directory whose immediate children are candidate leftovers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub path: PathBuf,
    pub category: FileCategory,
    pub requires_admin: bool,
}

impl CatalogEntry {
    pub fn new(path: impl Into<PathBuf>, category: FileCategory, requires_admin: bool) -> Self {
        Self {
            path: path.into(),
            category,
            requires_admin,
        }
    }
}

const USER_LIBRARY_DIRS: &[(&str, FileCategory)] = &[
    ("Application Support", FileCategory::ApplicationSupport),
    ("Caches", FileCategory::Caches),
    ("Preferences", FileCategory::Preferences),
    ("Logs", FileCategory::Logs),
    ("Containers", FileCategory::Containers),
    ("Group Containers", FileCategory::Containers),
    ("Saved Application State", FileCategory::SavedState),
    ("HTTPStorages", FileCategory::Caches),
    ("WebKit", FileCategory::WebKitData),
    ("Cookies", FileCategory::Cookies),
    ("LaunchAgents", FileCategory::LaunchAgents),
    ("Safari/Extensions", FileCategory::Extensions),
];

const SYSTEM_LIBRARY_DIRS: &[(&str, FileCategory)] = &[
    ("Application Support", FileCategory::ApplicationSupport),
    ("Caches", FileCategory::Caches),
    ("Preferences", FileCategory::Preferences),
    ("LaunchAgents", FileCategory::LaunchAgents),
    ("LaunchDaemons", FileCategory::LaunchDaemons),
    ("PrivilegedHelperTools", FileCategory::Other),
    ("Extensions", FileCategory::Extensions),
    ("SystemExtensions", FileCategory::Extensions),
];

/// Directories the scanner walks, in scan order.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    entries: Vec<CatalogEntry>,
}

impl DirectoryCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Per-user `~/Library` locations plus the admin-only `/Library` ones.
    pub fn standard(home: &Path) -> Self {
        Self::from_roots(&home.join("Library"), Path::new("/Library"), true)
    }

    pub fn user_only(home: &Path) -> Self {
        Self::from_roots(&home.join("Library"), Path::new("/Library"), false)
    }

    /// Build the fixed table against arbitrary Library roots.
    pub fn from_roots(user_library: &Path, system_library: &Path, include_system: bool) -> Self {
        let mut entries: Vec<CatalogEntry> = USER_LIBRARY_DIRS
            .iter()
            .map(|(sub, category)| CatalogEntry::new(user_library.join(sub), *category, false))
            .collect();

        if include_system {
            entries.extend(
                SYSTEM_LIBRARY_DIRS
                    .iter()
                    .map(|(sub, category)| CatalogEntry::new(system_library.join(sub), *category, true)),
            );
        }

        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
