#![cfg(unix)]

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use exterminator_core::error::{DeletionError, PathRejection, PrivilegedError};
use exterminator_core::removal::{
    AuthorizationToken, CurrentUserBroker, Deleter, HelperScript, PathSafetyValidator, PrivilegeBroker,
    PrivilegedDeleter, TrashStore,
};
use exterminator_core::{DiscoveredFile, FileCategory, OutcomeStatus, SilentReporter};

#[derive(Default)]
struct Calls {
    authorized: AtomicUsize,
    executed: AtomicUsize,
    released: AtomicUsize,
}

/// Broker whose answers are fixed up front.
struct ScriptedBroker {
    deny_authorization: Option<PrivilegedError>,
    fail_execution: Option<PrivilegedError>,
    calls: Arc<Calls>,
}

impl PrivilegeBroker for ScriptedBroker {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError> {
        self.calls.authorized.fetch_add(1, Ordering::SeqCst);
        match &self.deny_authorization {
            Some(err) => Err(err.clone()),
            None => Ok(AuthorizationToken::new()),
        }
    }

    fn execute(&self, _token: &AuthorizationToken, _script: &HelperScript) -> Result<String, PrivilegedError> {
        self.calls.executed.fetch_add(1, Ordering::SeqCst);
        match &self.fail_execution {
            Some(err) => Err(err.clone()),
            None => Ok(String::new()),
        }
    }

    fn release(&self, _token: &AuthorizationToken) {
        self.calls.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Swaps `parent` for a symlink to `outside` after validation, right before the helper runs.
struct ParentSwappingBroker {
    parent: PathBuf,
    outside: PathBuf,
}

impl PrivilegeBroker for ParentSwappingBroker {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError> {
        CurrentUserBroker.authorize()
    }

    fn execute(&self, token: &AuthorizationToken, script: &HelperScript) -> Result<String, PrivilegedError> {
        fs::rename(&self.parent, self.parent.with_extension("orig")).unwrap();
        symlink(&self.outside, &self.parent).unwrap();
        CurrentUserBroker.execute(token, script)
    }

    fn release(&self, token: &AuthorizationToken) {
        CurrentUserBroker.release(token)
    }
}

fn elevated_file(path: &Path, content: &[u8]) -> DiscoveredFile {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    DiscoveredFile::new(path, FileCategory::LaunchDaemons, content.len() as u64, true)
}

fn setup(root: &Path) -> (PathBuf, PathSafetyValidator) {
    let trash = root.join("Trash");
    fs::create_dir_all(&trash).unwrap();
    fs::create_dir_all(root.join("SysLibrary")).unwrap();
    (trash, PathSafetyValidator::new(vec![root.join("SysLibrary")]))
}

#[test]
fn test_current_user_helper_moves_files_into_trash() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    fs::write(trash.join("widget.log"), b"already here").unwrap();

    let daemon = elevated_file(&dir.path().join("SysLibrary/LaunchDaemons/com.acme.widget.plist"), b"daemon");
    let log = elevated_file(&dir.path().join("SysLibrary/Logs/widget.log"), b"new log");
    let quoted = elevated_file(&dir.path().join("SysLibrary/Caches/it's $(widget) \"x\""), b"quoted");

    let deleter = PrivilegedDeleter::new(Box::new(CurrentUserBroker), validator, &trash);
    let outcome = deleter
        .delete_with_privileges(&[daemon.clone(), log.clone(), quoted.clone()])
        .unwrap();

    assert_eq!(outcome.total_deleted(), 3, "failures: {:?}", outcome.failed);
    assert!(!daemon.path.exists());
    assert!(!log.path.exists());
    assert!(!quoted.path.exists());
    assert_eq!(fs::read(trash.join("com.acme.widget.plist")).unwrap(), b"daemon");
    assert_eq!(fs::read(trash.join("widget.log")).unwrap(), b"already here");
    assert_eq!(fs::read(trash.join("widget 1.log")).unwrap(), b"new log");
    assert_eq!(fs::read(trash.join("it's $(widget) \"x\"")).unwrap(), b"quoted");
}

#[test]
fn test_rejected_paths_fail_individually() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());

    let inside = elevated_file(&dir.path().join("SysLibrary/Caches/com.acme.widget"), b"in");
    let outside = elevated_file(&dir.path().join("var/db/secret"), b"secret");

    let deleter = PrivilegedDeleter::new(Box::new(CurrentUserBroker), validator, &trash);
    let outcome = deleter
        .delete_with_privileges(&[inside.clone(), outside.clone()])
        .unwrap();

    assert_eq!(outcome.succeeded, vec![inside]);
    assert_eq!(outcome.total_failed(), 1);
    assert!(matches!(
        &outcome.failed[0].1,
        DeletionError::Privileged(PrivilegedError::PathValidationFailed {
            reason: PathRejection::OutsideAllowedPrefixes,
            ..
        })
    ));
    assert_eq!(fs::read(&outside.path).unwrap(), b"secret");
}

#[test]
fn test_cancelled_authorization_fails_whole_call_and_touches_nothing() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let file = elevated_file(&dir.path().join("SysLibrary/Caches/com.acme.widget"), b"x");

    let calls = Arc::new(Calls::default());
    let broker = ScriptedBroker {
        deny_authorization: None,
        fail_execution: Some(PrivilegedError::AuthorizationCancelled),
        calls: calls.clone(),
    };
    let deleter = PrivilegedDeleter::new(Box::new(broker), validator, &trash);

    let err = deleter.delete_with_privileges(&[file.clone()]).unwrap_err();
    assert_eq!(err, PrivilegedError::AuthorizationCancelled);
    assert!(file.path.exists());
    assert_eq!(fs::read_dir(&trash).unwrap().count(), 0);
    assert_eq!(calls.released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_denied_authorization_never_runs_helper() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let file = elevated_file(&dir.path().join("SysLibrary/Caches/com.acme.widget"), b"x");

    let calls = Arc::new(Calls::default());
    let broker = ScriptedBroker {
        deny_authorization: Some(PrivilegedError::AuthorizationFailed("denied".into())),
        fail_execution: None,
        calls: calls.clone(),
    };
    let deleter = PrivilegedDeleter::new(Box::new(broker), validator, &trash);

    assert!(deleter.delete_with_privileges(&[file.clone()]).is_err());
    assert_eq!(calls.executed.load(Ordering::SeqCst), 0);
    assert_eq!(calls.released.load(Ordering::SeqCst), 0);
    assert!(file.path.exists());
}

#[test]
fn test_missing_trash_directory_fails_before_authorizing() {
    let dir = tempdir().unwrap();
    let (_, validator) = setup(dir.path());
    let file = elevated_file(&dir.path().join("SysLibrary/Caches/com.acme.widget"), b"x");

    let calls = Arc::new(Calls::default());
    let broker = ScriptedBroker {
        deny_authorization: None,
        fail_execution: None,
        calls: calls.clone(),
    };
    let missing = dir.path().join("NoTrash");
    let deleter = PrivilegedDeleter::new(Box::new(broker), validator, &missing);

    assert_eq!(
        deleter.delete_with_privileges(&[file]).unwrap_err(),
        PrivilegedError::TrashDirectoryNotFound(missing)
    );
    assert_eq!(calls.authorized.load(Ordering::SeqCst), 0);
}

#[test]
fn test_silent_helper_marks_every_entry_failed() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let file = elevated_file(&dir.path().join("SysLibrary/Caches/com.acme.widget"), b"x");

    let calls = Arc::new(Calls::default());
    let broker = ScriptedBroker {
        deny_authorization: None,
        fail_execution: None,
        calls: calls.clone(),
    };
    let deleter = PrivilegedDeleter::new(Box::new(broker), validator, &trash);

    let outcome = deleter.delete_with_privileges(&[file]).unwrap();
    assert_eq!(outcome.total_failed(), 1);
    assert!(matches!(
        &outcome.failed[0].1,
        DeletionError::Privileged(PrivilegedError::ScriptExecutionFailed(_))
    ));
    assert_eq!(calls.executed.load(Ordering::SeqCst), 1);
    assert_eq!(calls.released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deleter_merges_user_and_privileged_results() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let user_path = dir.path().join("Library/Caches/widget.cache");
    fs::create_dir_all(user_path.parent().unwrap()).unwrap();
    fs::write(&user_path, b"user").unwrap();
    let user = DiscoveredFile::new(&user_path, FileCategory::Caches, 4, false);
    let system = elevated_file(&dir.path().join("SysLibrary/LaunchAgents/com.acme.widget.agent.plist"), b"agent");

    let privileged = PrivilegedDeleter::new(Box::new(CurrentUserBroker), validator, &trash);
    let deleter = Deleter::new(TrashStore::new(&trash)).with_privileged(privileged);
    let outcome = deleter.delete(&[user, system], true, &SilentReporter);

    assert_eq!(outcome.status(), OutcomeStatus::Complete, "failures: {:?}", outcome.failed);
    assert_eq!(outcome.total_deleted(), 2);
    assert_eq!(outcome.size_reclaimed(), 9);
}

#[test]
fn test_batch_fatal_error_fails_all_elevated_files_in_deleter() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let a = elevated_file(&dir.path().join("SysLibrary/Caches/a.widget"), b"a");
    let b = elevated_file(&dir.path().join("SysLibrary/Caches/b.widget"), b"b");

    let broker = ScriptedBroker {
        deny_authorization: Some(PrivilegedError::AuthorizationCancelled),
        fail_execution: None,
        calls: Arc::new(Calls::default()),
    };
    let privileged = PrivilegedDeleter::new(Box::new(broker), validator, &trash);
    let deleter = Deleter::new(TrashStore::new(&trash)).with_privileged(privileged);
    let outcome = deleter.delete(&[a.clone(), b.clone()], true, &SilentReporter);

    assert_eq!(outcome.status(), OutcomeStatus::Failed);
    assert_eq!(outcome.total_failed(), 2);
    assert!(outcome.failed.iter().all(|(_, err)| matches!(
        err,
        DeletionError::Privileged(PrivilegedError::AuthorizationCancelled)
    )));
    assert!(a.path.exists() && b.path.exists());
}

#[test]
fn test_parent_swapped_for_symlink_after_validation_is_refused() {
    let dir = tempdir().unwrap();
    let (trash, validator) = setup(dir.path());
    let file = elevated_file(&dir.path().join("SysLibrary/Widget/victim"), b"inside");
    let outside = dir.path().join("etc");
    fs::create_dir_all(&outside).unwrap();
    fs::write(outside.join("victim"), b"PROTECTED").unwrap();

    let broker = ParentSwappingBroker {
        parent: dir.path().join("SysLibrary/Widget"),
        outside: outside.clone(),
    };
    let deleter = PrivilegedDeleter::new(Box::new(broker), validator, &trash);
    let outcome = deleter.delete_with_privileges(&[file]).unwrap();

    assert_eq!(outcome.total_deleted(), 0);
    assert_eq!(outcome.total_failed(), 1);
    match &outcome.failed[0].1 {
        DeletionError::Privileged(PrivilegedError::ScriptExecutionFailed(reason)) => {
            assert!(reason.contains("outside allowed prefixes"), "reason: {reason}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(fs::read(outside.join("victim")).unwrap(), b"PROTECTED");
    assert_eq!(fs::read(dir.path().join("SysLibrary/Widget.orig/victim")).unwrap(), b"inside");
    assert_eq!(fs::read_dir(&trash).unwrap().count(), 0);
}
