pub mod models;
pub mod queries;
pub mod sqlite;

pub use models::{Resource, ResourceFilter, StatusSummary, SyncState};
pub use sqlite::Database;
