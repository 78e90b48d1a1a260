pub mod catalog;
pub mod matcher;
pub mod size;

use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::identity::ApplicationIdentity;
use crate::model::{DiscoveredFile, FileCategory, ScanResult};
use crate::platform;
use crate::progress::ProgressReporter;

pub use catalog::{CatalogEntry, DirectoryCatalog};
pub use matcher::{build_search_terms, match_kind, matches, MatchKind, SearchTerms};

/// Finds an application's bundle and the leftovers it scattered across the catalog.
pub struct FileScanner {
    catalog: DirectoryCatalog,
    exclude_patterns: Vec<Pattern>,
}

impl FileScanner {
    pub fn new(catalog: DirectoryCatalog) -> Self {
        Self {
            catalog,
            exclude_patterns: Vec::new(),
        }
    }

    /// Discovered paths matching any of these globs are left out of results.
    pub fn with_exclude_patterns(mut self, globs: &[String]) -> Self {
        self.exclude_patterns = globs
            .iter()
            .filter_map(|glob| match Pattern::new(glob) {
                Ok(p) => Some(p),
                Err(e) => {
                    error!("Invalid glob pattern '{}': {}", glob, e);
                    None
                }
            })
            .collect();
        self
    }

    pub fn catalog(&self) -> &DirectoryCatalog {
        &self.catalog
    }

    /// Runs to completion. Catalog directories are scanned in parallel;
    /// results keep catalog order with the bundle first.
    pub fn scan(&self, identity: &ApplicationIdentity, reporter: &dyn ProgressReporter) -> ScanResult {
        let start = Instant::now();
        reporter.on_scan_start(self.catalog.len());

        let bundle_writable = identity
            .install_path
            .parent()
            .map(platform::is_writable)
            .unwrap_or(false);
        let mut files = vec![DiscoveredFile::new(
            identity.install_path.clone(),
            FileCategory::Application,
            size::entry_size(&identity.install_path),
            !bundle_writable,
        )];

        let terms = build_search_terms(identity).strict();
        debug!("Search terms for {}: {:?}", identity.bundle_identifier, terms);

        let per_directory: Vec<Vec<DiscoveredFile>> = self
            .catalog
            .entries()
            .par_iter()
            .map(|entry| {
                let found = self.scan_directory(entry, identity, &terms);
                reporter.on_directory_scanned(&entry.path, found.len());
                found
            })
            .collect();
        files.extend(per_directory.into_iter().flatten());

        let total_size_bytes = files.iter().map(|f| f.size_bytes).sum();
        let scan_duration = start.elapsed();
        reporter.on_scan_complete(files.len(), total_size_bytes, scan_duration.as_secs_f64());
        info!(
            "Scan of {} found {} items ({} bytes) in {:.2}s",
            identity.display_name,
            files.len(),
            total_size_bytes,
            scan_duration.as_secs_f64()
        );

        ScanResult {
            identity: identity.clone(),
            files,
            total_size_bytes,
            scan_duration,
        }
    }

    /// Missing or unreadable directories yield nothing; that is the common case.
    fn scan_directory(
        &self,
        entry: &CatalogEntry,
        identity: &ApplicationIdentity,
        terms: &SearchTerms,
    ) -> Vec<DiscoveredFile> {
        let read_dir = match fs::read_dir(&entry.path) {
            Ok(read_dir) => read_dir,
            Err(err) => {
                debug!("Skipping {}: {}", entry.path.display(), err);
                return Vec::new();
            }
        };

        let mut found = Vec::new();
        for child in read_dir.filter_map(|c| c.ok()) {
            let name = child.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = child.path();
            if path == identity.install_path || self.is_excluded(&path) {
                continue;
            }
            let Some(kind) = match_kind(&name, terms) else {
                continue;
            };
            debug!("{:?} match: {}", kind, path.display());

            let requires_elevated_privilege = entry.requires_admin || !platform::is_writable(&path);
            found.push(DiscoveredFile::new(
                path.clone(),
                entry.category,
                size::entry_size(&path),
                requires_elevated_privilege,
            ));
        }

        // read_dir order is filesystem-dependent
        found.sort_by(|a, b| a.path.cmp(&b.path));
        found
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.matches_path(path))
    }
}
