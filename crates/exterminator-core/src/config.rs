use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HelperKind {
    /// `do shell script ... with administrator privileges` through osascript.
    Osascript,
    /// `sudo -v` / `sudo -n` / `sudo -k`.
    Sudo,
    /// No elevation; runs the helper as the current user.
    CurrentUser,
}

impl Default for HelperKind {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            HelperKind::Osascript
        } else {
            HelperKind::Sudo
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub home_dir: Option<PathBuf>,
    pub trash_dir: Option<PathBuf>,
    pub history_file: Option<PathBuf>,
    pub include_system_dirs: bool,
    pub exclude_patterns: Vec<String>,
    pub privileged_helper: HelperKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            trash_dir: None,
            history_file: None,
            include_system_dirs: true,
            exclude_patterns: Vec::new(),
            privileged_helper: HelperKind::default(),
        }
    }
}

impl AppConfig {
    /// Home directory used for the catalog and allow-list.
    pub fn resolved_home_dir(&self) -> PathBuf {
        self.home_dir
            .clone()
            .unwrap_or_else(platform::default_home_dir)
    }

    pub fn resolved_trash_dir(&self) -> PathBuf {
        self.trash_dir
            .clone()
            .unwrap_or_else(|| platform::default_trash_dir(&self.resolved_home_dir()))
    }

    pub fn resolved_history_file(&self) -> PathBuf {
        self.history_file
            .clone()
            .unwrap_or_else(|| platform::default_history_file(&self.resolved_home_dir()))
    }
}

/// Load `Config.toml` (optional) and `EXTERMINATOR_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name("Config").required(false))
        .add_source(
            Environment::with_prefix("EXTERMINATOR")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("exclude_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
