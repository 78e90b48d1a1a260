pub mod config;
pub mod engine;
pub mod error;
pub mod identity;
pub mod model;
pub mod platform;
pub mod progress;
pub mod removal;
pub mod running;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use engine::Engine;
pub use error::Error;
pub use identity::ApplicationIdentity;
pub use model::{DiscoveredFile, FileCategory, OutcomeStatus, ScanResult};
pub use progress::{ProgressReporter, SilentReporter};
