//! agentkb core - shared domain types for the per-agent knowledge base.

mod error;
mod types;

pub use error::{Error, Result};
pub use types::*;
