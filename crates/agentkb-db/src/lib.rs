//! agentkb DB - SQLite storage for agents, documents, ingestion runs and
//! the tenant-scoped chunk index.

mod database;
mod error;
mod migrations;
mod operations;

pub use database::Database;
pub use error::{DbError, DbResult};
pub use operations::runs::RunFilter;
pub use operations::vectors::cosine_similarity;
