pub mod deleter;
pub mod path_safety;
pub mod privileged;
pub mod restore;
pub mod trash;

pub use deleter::Deleter;
pub use path_safety::PathSafetyValidator;
pub use privileged::{
    AuthorizationToken, CurrentUserBroker, HelperEntry, HelperReport, HelperScript, OsascriptBroker,
    PrivilegeBroker, PrivilegedDeleter, SudoBroker,
};
pub use restore::TrashRestorer;
pub use trash::TrashStore;
