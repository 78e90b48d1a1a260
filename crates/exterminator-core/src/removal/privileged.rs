use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DeletionError, PrivilegedError};
use crate::model::{DiscoveredFile, PrivilegedOutcome};
use crate::removal::path_safety::PathSafetyValidator;
use crate::removal::trash::{split_name, unique_trash_name, MAX_COLLISION_ATTEMPTS};

const OSASCRIPT: &str = "/usr/bin/osascript";
const SUDO: &str = "/usr/bin/sudo";
const SHELL: &str = "/bin/sh";

/// AppleScript's "user cancelled" error number.
const APPLESCRIPT_USER_CANCELLED: &str = "(-128)";

const SUDO_PASSWORD_REQUIRED: &str = "password is required";

/// Proof that elevation was granted for one batch.
#[derive(Debug)]
pub struct AuthorizationToken {
    id: Uuid,
}

impl AuthorizationToken {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Default for AuthorizationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Obtains elevation and runs the trash helper with it.
pub trait PrivilegeBroker: Send + Sync {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError>;

    /// Run the helper once; returns its standard output.
    fn execute(&self, token: &AuthorizationToken, script: &HelperScript) -> Result<String, PrivilegedError>;

    fn release(&self, token: &AuthorizationToken);
}

/// Releases the token on every exit path, panics included.
struct AuthorizationScope<'a> {
    broker: &'a dyn PrivilegeBroker,
    token: AuthorizationToken,
}

impl<'a> AuthorizationScope<'a> {
    fn acquire(broker: &'a dyn PrivilegeBroker) -> Result<Self, PrivilegedError> {
        let token = broker.authorize()?;
        debug!("Authorization {} granted", token.id());
        Ok(Self { broker, token })
    }

    fn token(&self) -> &AuthorizationToken {
        &self.token
    }
}

impl Drop for AuthorizationScope<'_> {
    fn drop(&mut self) {
        debug!("Releasing authorization {}", self.token.id());
        self.broker.release(&self.token);
    }
}

/// One move the helper performs. Every field travels base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperEntry {
    pub source: PathBuf,
    pub trash_dir: PathBuf,
    pub destination_name: String,
}

/// What the helper reported for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HelperReport {
    Moved(PathBuf),
    Failed(String),
}

const HELPER_PRELUDE: &str = r#"d() { printf '%s' "$1" | base64 --decode; }
e() { printf '%s' "$1" | base64 | tr -d '\n'; }
present() { [ -e "$1" ] || [ -L "$1" ]; }
allowed() {
  for p in $PREFIXES; do
    prefix="$(d "$p")"
    case "$1" in
      "$prefix"/?*) return 0 ;;
    esac
  done
  return 1
}
trash_move() {
  i="$1"
  src="$(d "$2")"; dir="$(d "$3")"; name="$(d "$4")"; stem="$(d "$5")"; ext="$(d "$6")"
  if [ -z "$src" ] || [ -z "$dir" ] || [ -z "$name" ]; then echo "err $i undecodable argument"; return; fi
  if [ ! -d "$dir" ]; then echo "err $i trash directory missing"; return; fi
  parent="${src%/*}"; leaf="${src##*/}"
  if [ -z "$parent" ]; then parent=/; fi
  if [ -z "$leaf" ]; then echo "err $i undecodable argument"; return; fi
  if ! cd -P "$parent" 2>/dev/null; then echo "err $i source missing"; return; fi
  real="$(pwd -P)"
  if ! allowed "$real/$leaf"; then echo "err $i outside allowed prefixes"; return; fi
  if ! present "./$leaf"; then echo "err $i source missing"; return; fi
  dst="$dir/$name"; n=1
  while present "$dst"; do
    if [ "$n" -gt __MAX__ ]; then echo "err $i no free name in trash"; return; fi
    if [ -n "$ext" ]; then dst="$dir/$stem $n.$ext"; else dst="$dir/$stem $n"; fi
    n=$((n + 1))
  done
  if mv -n -- "./$leaf" "$dst" 2>/dev/null && present "$dst" && ! present "./$leaf"; then
    echo "ok $i $(e "$dst")"
  else
    echo "err $i move failed"
  fi
}
"#;

/// Shell program run by the elevated helper for a whole batch.
///
/// Paths never appear as literal shell text: each argument is base64 and is
/// decoded inside the helper, so quoting and metacharacters in file names
/// cannot change what the shell executes.
///
/// The helper resolves each source's parent again, checks it against the
/// allowed prefixes and moves the entry relative to that directory. A
/// symlink swapped into the parent chain after validation is refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperScript {
    text: String,
    entries: usize,
}

impl HelperScript {
    pub fn build(entries: &[HelperEntry], allowed_prefixes: &[PathBuf]) -> Self {
        let mut text = HELPER_PRELUDE.replace("__MAX__", &MAX_COLLISION_ATTEMPTS.to_string());
        let prefixes: Vec<String> = allowed_prefixes
            .iter()
            .map(|prefix| encode(&prefix.to_string_lossy()))
            .collect();
        text.push_str(&format!("PREFIXES='{}'\n", prefixes.join(" ")));
        for (index, entry) in entries.iter().enumerate() {
            let (stem, ext) = split_name(&entry.destination_name_root());
            let args = [
                encode(&entry.source.to_string_lossy()),
                encode(&entry.trash_dir.to_string_lossy()),
                encode(&entry.destination_name),
                encode(&stem),
                encode(ext.as_deref().unwrap_or("")),
            ];
            text.push_str(&format!("trash_move {index}"));
            for arg in &args {
                text.push_str(&format!(" '{arg}'"));
            }
            text.push('\n');
        }
        Self {
            text,
            entries: entries.len(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// The script as an AppleScript string literal body.
    pub fn to_applescript_literal(&self) -> String {
        self.text
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }

    /// Map helper output lines back to entries; entries without a line are `None`.
    pub fn parse_output(&self, stdout: &str) -> Vec<Option<HelperReport>> {
        let mut reports = vec![None; self.entries];
        for line in stdout.lines() {
            let mut parts = line.trim_end().splitn(3, ' ');
            let (status, index, rest) = match (parts.next(), parts.next(), parts.next()) {
                (Some(status), Some(index), rest) => (status, index, rest.unwrap_or("")),
                _ => continue,
            };
            let Ok(index) = index.parse::<usize>() else {
                continue;
            };
            let Some(slot) = reports.get_mut(index) else {
                continue;
            };
            *slot = match status {
                "ok" => {
                    let destination = BASE64
                        .decode(rest)
                        .ok()
                        .and_then(|bytes| String::from_utf8(bytes).ok())
                        .map(PathBuf::from)
                        .unwrap_or_default();
                    Some(HelperReport::Moved(destination))
                }
                "err" => Some(HelperReport::Failed(rest.to_string())),
                _ => continue,
            };
        }
        reports
    }
}

impl HelperEntry {
    /// The original file name, used for the helper's own collision fallback.
    fn destination_name_root(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.destination_name.clone())
    }
}

fn encode(value: &str) -> String {
    BASE64.encode(value.as_bytes())
}

fn run(command: &mut Command) -> Result<Output, PrivilegedError> {
    command
        .stdin(Stdio::null())
        .output()
        .map_err(|e| PrivilegedError::ScriptExecutionFailed(e.to_string()))
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_string()
}

/// A dismissed password dialog is `AuthorizationCancelled`; anything else failed the helper.
fn classify_osascript_failure(stderr: &str) -> PrivilegedError {
    if stderr.contains(APPLESCRIPT_USER_CANCELLED) {
        PrivilegedError::AuthorizationCancelled
    } else {
        PrivilegedError::ScriptExecutionFailed(stderr.to_string())
    }
}

/// `sudo -n` without a cached credential refuses before running anything.
fn classify_sudo_failure(stderr: &str) -> PrivilegedError {
    if stderr.contains(SUDO_PASSWORD_REQUIRED) {
        PrivilegedError::AuthorizationFailed(stderr.to_string())
    } else {
        PrivilegedError::ScriptExecutionFailed(stderr.to_string())
    }
}

/// `do shell script ... with administrator privileges` through osascript.
///
/// The system prompts when the helper runs, so `authorize` only checks that
/// osascript is present; a cancelled prompt surfaces from `execute` before the
/// helper has touched anything.
pub struct OsascriptBroker;

impl PrivilegeBroker for OsascriptBroker {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError> {
        if !Path::new(OSASCRIPT).exists() {
            return Err(PrivilegedError::AuthorizationFailed(format!(
                "{OSASCRIPT} is not available"
            )));
        }
        Ok(AuthorizationToken::new())
    }

    fn execute(&self, _token: &AuthorizationToken, script: &HelperScript) -> Result<String, PrivilegedError> {
        let source = format!(
            "do shell script \"{}\" with administrator privileges without altering line endings",
            script.to_applescript_literal()
        );
        let output = run(Command::new(OSASCRIPT).arg("-e").arg(source))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        Err(classify_osascript_failure(&stderr_text(&output)))
    }

    fn release(&self, _token: &AuthorizationToken) {}
}

/// `sudo -v` to authorize, `sudo -n` to run, `sudo -k` to drop the cached credential.
pub struct SudoBroker;

impl PrivilegeBroker for SudoBroker {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError> {
        // Inherits the terminal so sudo can prompt.
        let status = Command::new(SUDO)
            .arg("-v")
            .status()
            .map_err(|e| PrivilegedError::AuthorizationFailed(e.to_string()))?;
        if !status.success() {
            return Err(PrivilegedError::AuthorizationFailed(format!(
                "sudo -v exited with {status}"
            )));
        }
        Ok(AuthorizationToken::new())
    }

    fn execute(&self, _token: &AuthorizationToken, script: &HelperScript) -> Result<String, PrivilegedError> {
        let output = run(Command::new(SUDO).args(["-n", SHELL, "-c"]).arg(script.as_str()))?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        Err(classify_sudo_failure(&stderr_text(&output)))
    }

    fn release(&self, _token: &AuthorizationToken) {
        if let Err(e) = Command::new(SUDO).arg("-k").status() {
            warn!("Failed to drop sudo credentials: {}", e);
        }
    }
}

/// Runs the helper with the current user's rights, for hosts that already
/// hold them (for example when running as root).
pub struct CurrentUserBroker;

impl PrivilegeBroker for CurrentUserBroker {
    fn authorize(&self) -> Result<AuthorizationToken, PrivilegedError> {
        Ok(AuthorizationToken::new())
    }

    fn execute(&self, _token: &AuthorizationToken, script: &HelperScript) -> Result<String, PrivilegedError> {
        let output = run(Command::new(SHELL).arg("-c").arg(script.as_str()))?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(PrivilegedError::ScriptExecutionFailed(stderr_text(&output)))
        }
    }

    fn release(&self, _token: &AuthorizationToken) {}
}

/// Trashes files the current user cannot write, through a [`PrivilegeBroker`].
pub struct PrivilegedDeleter {
    broker: Box<dyn PrivilegeBroker>,
    validator: PathSafetyValidator,
    trash_dir: PathBuf,
}

impl PrivilegedDeleter {
    pub fn new(
        broker: Box<dyn PrivilegeBroker>,
        validator: PathSafetyValidator,
        trash_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            broker,
            validator,
            trash_dir: trash_dir.into(),
        }
    }

    /// Authorization is requested once; a denial fails the whole call before
    /// any file is touched. After that each file succeeds or fails on its own.
    pub fn delete_with_privileges(&self, files: &[DiscoveredFile]) -> Result<PrivilegedOutcome, PrivilegedError> {
        let mut outcome = PrivilegedOutcome::default();
        if files.is_empty() {
            return Ok(outcome);
        }

        if !self.trash_dir.is_dir() {
            error!("Trash directory {} not found", self.trash_dir.display());
            return Err(PrivilegedError::TrashDirectoryNotFound(self.trash_dir.clone()));
        }

        let scope = AuthorizationScope::acquire(self.broker.as_ref())?;

        let mut reserved: HashSet<String> = HashSet::new();
        let mut entries: Vec<HelperEntry> = Vec::new();
        let mut pending: Vec<&DiscoveredFile> = Vec::new();

        for file in files {
            match self.prepare(file, &mut reserved) {
                Ok(entry) => {
                    entries.push(entry);
                    pending.push(file);
                }
                Err(err) => {
                    warn!("{}", err);
                    outcome.failed.push((file.clone(), DeletionError::Privileged(err)));
                }
            }
        }

        if entries.is_empty() {
            return Ok(outcome);
        }

        let script = HelperScript::build(&entries, &self.validator.resolved_prefixes());
        let reports = match self.broker.execute(scope.token(), &script) {
            Ok(stdout) => script.parse_output(&stdout),
            Err(err) if err.is_batch_fatal() => {
                error!("Privileged helper refused: {}", err);
                return Err(err);
            }
            Err(err) => {
                warn!("Privileged helper failed: {}", err);
                for file in pending {
                    outcome
                        .failed
                        .push((file.clone(), DeletionError::Privileged(err.clone())));
                }
                return Ok(outcome);
            }
        };

        for (file, report) in pending.into_iter().zip(reports) {
            match report {
                Some(HelperReport::Moved(destination)) => {
                    debug!("Trashed {} -> {}", file.path.display(), destination.display());
                    outcome.succeeded.push(file.clone());
                }
                Some(HelperReport::Failed(reason)) => {
                    warn!("Privileged move of {} failed: {}", file.path.display(), reason);
                    outcome.failed.push((
                        file.clone(),
                        DeletionError::Privileged(PrivilegedError::ScriptExecutionFailed(reason)),
                    ));
                }
                None => outcome.failed.push((
                    file.clone(),
                    DeletionError::Privileged(PrivilegedError::ScriptExecutionFailed(
                        "helper reported no result".to_string(),
                    )),
                )),
            }
        }

        info!(
            "Privileged deletion: {} succeeded, {} failed",
            outcome.total_deleted(),
            outcome.total_failed()
        );
        Ok(outcome)
    }

    fn prepare(&self, file: &DiscoveredFile, reserved: &mut HashSet<String>) -> Result<HelperEntry, PrivilegedError> {
        let source = self
            .validator
            .validate(&file.path)
            .map_err(|reason| PrivilegedError::PathValidationFailed {
                path: file.path.clone(),
                reason,
            })?;

        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination_name = unique_trash_name(&self.trash_dir, &file_name, reserved).ok_or_else(|| {
            PrivilegedError::ScriptExecutionFailed(format!("no free trash name for {file_name}"))
        })?;
        reserved.insert(destination_name.clone());

        Ok(HelperEntry {
            source,
            trash_dir: self.trash_dir.clone(),
            destination_name,
        })
    }
}
