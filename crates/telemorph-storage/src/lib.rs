// telemorph-storage - Persistence contract and adapters
//
// The ingestion and query layers depend only on `TelemetryStore`. Adapters
// (SQLite for real deployments, memory for tests and ephemeral runs) are
// constructed once at startup and passed around as `Arc<dyn TelemetryStore>`.

pub mod error;
pub mod memory;
pub mod query;
pub mod sqlite;
pub mod store;

pub use error::{ErrorCode, Result, StorageError};
pub use memory::MemoryStore;
pub use query::{dispatch, fetch, QueryData, QueryError, QueryLimits, QueryPage, QueryRequest};
pub use sqlite::{SqliteOptions, SqliteStore};
pub use store::{Page, StoredRecord, TelemetryStore};
