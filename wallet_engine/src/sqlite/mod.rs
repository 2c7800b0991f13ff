//! SQLite backend for the wallet engine.
//!
//! Migrations live in `src/sqlite/migrations` and are embedded at compile time.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::{SqliteDatabase, DEFAULT_STORE_TIMEOUT};
