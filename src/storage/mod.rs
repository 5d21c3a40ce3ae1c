//! Storage implementations.

pub mod schema;
pub mod sqlite;

pub use sqlite::{
    init_schema, SqliteAuditStore, SqliteHistoryStore, SqliteOrderStore, SqliteProofStore,
    SqliteQuoteStore,
};
