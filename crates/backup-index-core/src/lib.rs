pub mod catalog;
pub mod chunked;
pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod progress;
pub mod queue;
pub mod remote;
pub mod retry;
pub mod scanner;
pub mod storage;

pub use config::AppConfig;
pub use engine::{RestoreStats, SyncEngine, SyncResult};
pub use error::{Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
pub use queue::DrainStats;
pub use remote::{LocalDirStore, RemoteStore};
pub use scanner::ScanStats;
pub use storage::{Database, Resource, ResourceFilter};
