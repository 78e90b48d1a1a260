use tracing::info;
use uuid::Uuid;

use crate::config::{AppConfig, HelperKind};
use crate::error::Error;
use crate::identity::ApplicationIdentity;
use crate::model::{DeletionOutcome, DeletionRecord, DiscoveredFile, RestoreOutcome, ScanResult};
use crate::progress::ProgressReporter;
use crate::removal::{
    CurrentUserBroker, Deleter, OsascriptBroker, PathSafetyValidator, PrivilegeBroker, PrivilegedDeleter,
    SudoBroker, TrashRestorer, TrashStore,
};
use crate::scanner::{DirectoryCatalog, FileScanner};
use crate::storage::HistoryStore;

/// Scan, delete, record and restore for one configuration.
pub struct Engine {
    config: AppConfig,
    scanner: FileScanner,
    deleter: Deleter,
    restorer: TrashRestorer,
    history: HistoryStore,
}

impl Engine {
    pub fn new(config: AppConfig) -> Result<Self, Error> {
        let broker: Box<dyn PrivilegeBroker> = match config.privileged_helper {
            HelperKind::Osascript => Box::new(OsascriptBroker),
            HelperKind::Sudo => Box::new(SudoBroker),
            HelperKind::CurrentUser => Box::new(CurrentUserBroker),
        };
        Self::with_broker(config, broker)
    }

    /// Like [`Engine::new`], with an explicit elevation mechanism.
    pub fn with_broker(config: AppConfig, broker: Box<dyn PrivilegeBroker>) -> Result<Self, Error> {
        let home = config.resolved_home_dir();
        let trash_dir = config.resolved_trash_dir();

        let catalog = if config.include_system_dirs {
            DirectoryCatalog::standard(&home)
        } else {
            DirectoryCatalog::user_only(&home)
        };
        let scanner = FileScanner::new(catalog).with_exclude_patterns(&config.exclude_patterns);

        let privileged = PrivilegedDeleter::new(broker, PathSafetyValidator::system_default(&home), &trash_dir);
        let deleter = Deleter::new(TrashStore::new(&trash_dir)).with_privileged(privileged);
        let restorer = TrashRestorer::new(&trash_dir);
        let history = HistoryStore::load(config.resolved_history_file())?;

        info!(
            "Engine ready: home {}, trash {}, {} catalog directories",
            home.display(),
            trash_dir.display(),
            scanner.catalog().len()
        );

        Ok(Self {
            config,
            scanner,
            deleter,
            restorer,
            history,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn scanner(&self) -> &FileScanner {
        &self.scanner
    }

    pub fn restorer(&self) -> &TrashRestorer {
        &self.restorer
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn scan(&self, identity: &ApplicationIdentity, reporter: &dyn ProgressReporter) -> Result<ScanResult, Error> {
        identity.ensure_deletable()?;
        Ok(self.scanner.scan(identity, reporter))
    }

    /// Trash `files` and record whatever was actually deleted.
    pub fn delete(
        &self,
        identity: &ApplicationIdentity,
        files: &[DiscoveredFile],
        include_elevated: bool,
        reporter: &dyn ProgressReporter,
    ) -> Result<(DeletionOutcome, Option<DeletionRecord>), Error> {
        identity.ensure_deletable()?;
        let outcome = self.deleter.delete(files, include_elevated, reporter);
        let record = self.history.create_record(identity, &outcome)?;
        Ok((outcome, record))
    }

    /// Restore a recorded deletion. A fully restored record leaves the history.
    pub fn restore(&self, record_id: Uuid, reporter: &dyn ProgressReporter) -> Result<RestoreOutcome, Error> {
        let record = self
            .history
            .get(record_id)
            .ok_or_else(|| Error::Other(format!("No deletion record with id {record_id}")))?;

        let outcome = self.restorer.restore_record(&record, reporter);
        if outcome.is_complete() {
            self.history.remove(record.id)?;
        }
        Ok(outcome)
    }
}
