use std::path::{Path, PathBuf};

use crate::error::IdentityError;

const SYSTEM_APP_PREFIXES: &[&str] = &[
    "/System/Applications/",
    "/System/Library/CoreServices/",
    "/System/Library/PreferencePanes/",
];

const CRITICAL_BUNDLE_IDS: &[&str] = &[
    "com.apple.finder",
    "com.apple.dock",
    "com.apple.SystemPreferences",
    "com.apple.systempreferences",
    "com.apple.loginwindow",
    "com.apple.AppStore",
];

/// A resolved application: where it is installed and how it names itself.
///
/// Produced by whatever inspects the bundle manifest; the engine only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationIdentity {
    pub install_path: PathBuf,
    pub display_name: String,
    pub bundle_identifier: String,
    pub is_protected_system_app: bool,
}

impl ApplicationIdentity {
    pub fn new(
        install_path: impl Into<PathBuf>,
        display_name: impl Into<String>,
        bundle_identifier: impl Into<String>,
    ) -> Self {
        let install_path = install_path.into();
        let is_protected_system_app = is_under_system_prefix(&install_path);
        Self {
            install_path,
            display_name: display_name.into(),
            bundle_identifier: bundle_identifier.into(),
            is_protected_system_app,
        }
    }

    /// Build an identity for a `.app` bundle whose identifier is already known.
    ///
    /// Without an explicit display name the bundle's file stem is used.
    pub fn from_bundle_path(
        install_path: impl Into<PathBuf>,
        bundle_identifier: &str,
        display_name: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let install_path = install_path.into();
        let is_bundle = install_path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("app"))
            .unwrap_or(false);
        if !is_bundle {
            return Err(IdentityError::NotAnAppBundle(install_path));
        }

        let bundle_identifier = bundle_identifier.trim();
        if bundle_identifier.is_empty() {
            return Err(IdentityError::MissingBundleIdentifier);
        }

        let name = match display_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => install_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };

        Ok(Self::new(install_path, name, bundle_identifier))
    }

    pub fn with_protected_flag(mut self, protected: bool) -> Self {
        self.is_protected_system_app = protected;
        self
    }

    /// Apple-published applications; not necessarily protected.
    pub fn is_apple_app(&self) -> bool {
        self.bundle_identifier.starts_with("com.apple.")
    }

    /// Refuse identities the engine must never remove.
    pub fn ensure_deletable(&self) -> Result<(), IdentityError> {
        if self.is_protected_system_app
            || CRITICAL_BUNDLE_IDS.contains(&self.bundle_identifier.as_str())
            || is_under_system_prefix(&self.install_path)
        {
            return Err(IdentityError::ProtectedSystemApp(self.display_name.clone()));
        }
        Ok(())
    }
}

fn is_under_system_prefix(path: &Path) -> bool {
    let path = path.to_string_lossy();
    SYSTEM_APP_PREFIXES
        .iter()
        .any(|prefix| path.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bundle_path_uses_file_stem_as_name() {
        let app =
            ApplicationIdentity::from_bundle_path("/Applications/Acme Widget.app", "com.acme.widget", None)
                .unwrap();
        assert_eq!(app.display_name, "Acme Widget");
        assert_eq!(app.bundle_identifier, "com.acme.widget");
        assert!(!app.is_protected_system_app);
    }

    #[test]
    fn test_from_bundle_path_rejects_non_bundles() {
        let err = ApplicationIdentity::from_bundle_path("/Applications/readme.txt", "com.acme.widget", None)
            .unwrap_err();
        assert!(matches!(err, IdentityError::NotAnAppBundle(_)));

        let err = ApplicationIdentity::from_bundle_path("/Applications/Widget.app", "  ", None)
            .unwrap_err();
        assert_eq!(err, IdentityError::MissingBundleIdentifier);
    }

    #[test]
    fn test_system_locations_are_protected() {
        let app = ApplicationIdentity::new("/System/Applications/Chess.app", "Chess", "com.apple.Chess");
        assert!(app.is_protected_system_app);
        assert!(app.ensure_deletable().is_err());
    }

    #[test]
    fn test_critical_bundle_ids_are_protected_anywhere() {
        let app = ApplicationIdentity::new("/Applications/Finder.app", "Finder", "com.apple.finder");
        assert!(matches!(
            app.ensure_deletable(),
            Err(IdentityError::ProtectedSystemApp(name)) if name == "Finder"
        ));
    }

    #[test]
    fn test_apple_app_outside_system_is_deletable() {
        let app = ApplicationIdentity::new("/Applications/Pages.app", "Pages", "com.apple.iWork.Pages");
        assert!(app.is_apple_app());
        assert!(app.ensure_deletable().is_ok());
    }
}
