use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::error::{DeletionError, RestoreError};
use crate::identity::ApplicationIdentity;

/// Where a discovered file was found; drives grouping in scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Application,
    Preferences,
    ApplicationSupport,
    Caches,
    Logs,
    Containers,
    LaunchAgents,
    LaunchDaemons,
    Extensions,
    LoginItems,
    Cookies,
    #[serde(rename = "webKit", alias = "webKitData")]
    WebKitData,
    SavedState,
    Other,
}

impl FileCategory {
    pub const ALL: [FileCategory; 14] = [
        FileCategory::Application,
        FileCategory::Preferences,
        FileCategory::ApplicationSupport,
        FileCategory::Caches,
        FileCategory::Logs,
        FileCategory::Containers,
        FileCategory::LaunchAgents,
        FileCategory::LaunchDaemons,
        FileCategory::Extensions,
        FileCategory::LoginItems,
        FileCategory::Cookies,
        FileCategory::WebKitData,
        FileCategory::SavedState,
        FileCategory::Other,
    ];

    /// Stable key, identical to the persisted form.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCategory::Application => "application",
            FileCategory::Preferences => "preferences",
            FileCategory::ApplicationSupport => "applicationSupport",
            FileCategory::Caches => "caches",
            FileCategory::Logs => "logs",
            FileCategory::Containers => "containers",
            FileCategory::LaunchAgents => "launchAgents",
            FileCategory::LaunchDaemons => "launchDaemons",
            FileCategory::Extensions => "extensions",
            FileCategory::LoginItems => "loginItems",
            FileCategory::Cookies => "cookies",
            FileCategory::WebKitData => "webKit",
            FileCategory::SavedState => "savedState",
            FileCategory::Other => "other",
        }
    }
}

/// A file or directory believed to belong to the scanned application.
///
/// Equality and hashing use `id` only, so copies stay interchangeable even
/// if a host rewrites the path for display.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub id: Uuid,
    pub path: PathBuf,
    pub category: FileCategory,
    pub size_bytes: u64,
    pub requires_elevated_privilege: bool,
}

impl DiscoveredFile {
    pub fn new(
        path: impl Into<PathBuf>,
        category: FileCategory,
        size_bytes: u64,
        requires_elevated_privilege: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            category,
            size_bytes,
            requires_elevated_privilege,
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl PartialEq for DiscoveredFile {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DiscoveredFile {}

impl Hash for DiscoveredFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Debug, Clone)]
pub struct ScanResult {
    pub identity: ApplicationIdentity,
    pub files: Vec<DiscoveredFile>,
    pub total_size_bytes: u64,
    pub scan_duration: Duration,
}

impl ScanResult {
    pub fn files_by_category(&self) -> BTreeMap<FileCategory, Vec<&DiscoveredFile>> {
        let mut grouped: BTreeMap<FileCategory, Vec<&DiscoveredFile>> = BTreeMap::new();
        for file in &self.files {
            grouped.entry(file.category).or_default().push(file);
        }
        grouped
    }

    pub fn scan_duration_secs(&self) -> f64 {
        self.scan_duration.as_secs_f64()
    }

    pub fn elevated_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.requires_elevated_privilege)
            .count()
    }
}

/// Fully succeeded, partially succeeded, or fully failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Complete,
    Partial,
    Failed,
}

impl OutcomeStatus {
    fn from_counts(succeeded: usize, unfinished: usize) -> Self {
        if unfinished == 0 {
            OutcomeStatus::Complete
        } else if succeeded == 0 {
            OutcomeStatus::Failed
        } else {
            OutcomeStatus::Partial
        }
    }
}

#[derive(Debug, Default)]
pub struct DeletionOutcome {
    pub succeeded: Vec<DiscoveredFile>,
    pub failed: Vec<(DiscoveredFile, DeletionError)>,
    pub skipped_privileged: Vec<DiscoveredFile>,
}

impl DeletionOutcome {
    pub fn total_deleted(&self) -> usize {
        self.succeeded.len()
    }

    pub fn total_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn total_skipped(&self) -> usize {
        self.skipped_privileged.len()
    }

    pub fn size_reclaimed(&self) -> u64 {
        self.succeeded.iter().map(|f| f.size_bytes).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped_privileged.is_empty()
    }

    pub fn status(&self) -> OutcomeStatus {
        OutcomeStatus::from_counts(
            self.succeeded.len(),
            self.failed.len() + self.skipped_privileged.len(),
        )
    }

    /// Concatenate another outcome's entries onto this one.
    pub fn merge(mut self, other: DeletionOutcome) -> DeletionOutcome {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
        self.skipped_privileged.extend(other.skipped_privileged);
        self
    }
}

/// What a privileged batch did once authorization succeeded.
#[derive(Debug, Default)]
pub struct PrivilegedOutcome {
    pub succeeded: Vec<DiscoveredFile>,
    pub failed: Vec<(DiscoveredFile, DeletionError)>,
}

impl PrivilegedOutcome {
    pub fn total_deleted(&self) -> usize {
        self.succeeded.len()
    }

    pub fn total_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn size_reclaimed(&self) -> u64 {
        self.succeeded.iter().map(|f| f.size_bytes).sum()
    }
}

impl From<PrivilegedOutcome> for DeletionOutcome {
    fn from(outcome: PrivilegedOutcome) -> Self {
        DeletionOutcome {
            succeeded: outcome.succeeded,
            failed: outcome.failed,
            skipped_privileged: Vec::new(),
        }
    }
}

/// One deleted file as remembered by the history; matched back by path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedFileDescriptor {
    pub original_path: PathBuf,
    pub category: FileCategory,
    pub size_bytes: u64,
}

impl DeletedFileDescriptor {
    pub fn new(original_path: impl Into<PathBuf>, category: FileCategory, size_bytes: u64) -> Self {
        Self {
            original_path: original_path.into(),
            category,
            size_bytes,
        }
    }

    pub fn path(&self) -> &Path {
        &self.original_path
    }
}

impl From<&DiscoveredFile> for DeletedFileDescriptor {
    fn from(file: &DiscoveredFile) -> Self {
        Self::new(file.path.clone(), file.category, file.size_bytes)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub app_display_name: String,
    pub bundle_identifier: String,
    pub deleted_files: Vec<DeletedFileDescriptor>,
}

impl DeletionRecord {
    /// Record the files that actually left disk; failures and skips are not remembered.
    pub fn from_outcome(identity: &ApplicationIdentity, outcome: &DeletionOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            app_display_name: identity.display_name.clone(),
            bundle_identifier: identity.bundle_identifier.clone(),
            deleted_files: outcome.succeeded.iter().map(DeletedFileDescriptor::from).collect(),
        }
    }

    pub fn total_size_reclaimed(&self) -> u64 {
        self.deleted_files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn file_count(&self) -> usize {
        self.deleted_files.len()
    }
}

#[derive(Debug, Default)]
pub struct RestoreOutcome {
    pub restored: Vec<DeletedFileDescriptor>,
    pub failed: Vec<(DeletedFileDescriptor, RestoreError)>,
    pub not_found_in_trash: Vec<DeletedFileDescriptor>,
}

impl RestoreOutcome {
    pub fn total_restored(&self) -> usize {
        self.restored.len()
    }

    pub fn total_failed(&self) -> usize {
        self.failed.len()
    }

    pub fn total_not_in_trash(&self) -> usize {
        self.not_found_in_trash.len()
    }

    pub fn restored_size(&self) -> u64 {
        self.restored.iter().map(|f| f.size_bytes).sum()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.not_found_in_trash.is_empty()
    }

    pub fn status(&self) -> OutcomeStatus {
        OutcomeStatus::from_counts(
            self.restored.len(),
            self.failed.len() + self.not_found_in_trash.len(),
        )
    }
}
