//! # SQLite database methods
//!
//! This module contains the "low-level" SQLite interactions of the wallet engine.
//!
//! Every interaction is a plain function that accepts a `&mut SqliteConnection`. Callers can hand over a pooled
//! connection for a one-off read, or open a transaction and chain several calls into a single atomic unit of work
//! without changing anything else.
//!
//! The composite operations in [`ledger`], [`orders::settle`], [`payments::complete`], [`referrals::issue`] and
//! [`otp::check`] expect to be run inside a transaction, and always start with a write so that SQLite takes the write
//! lock before anything is read.
use std::{env, str::FromStr, time::Duration};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod idempotency;
pub mod ledger;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod referrals;
pub mod transactions;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/grocer_wallet.db";

pub fn db_url() -> String {
    let result = env::var("GW_DATABASE_URL").unwrap_or_else(|_| {
        info!("GW_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

/// Opens a connection pool. `busy_timeout` bounds how long a connection waits for another writer before failing.
pub async fn new_pool(url: &str, max_connections: u32, busy_timeout: Duration) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// True if the error is a UNIQUE constraint violation on the given `table.column`.
pub(crate) fn is_unique_violation_on(e: &SqlxError, column: &str) -> bool {
    match e {
        SqlxError::Database(err) => err.is_unique_violation() && err.message().contains(column),
        _ => false,
    }
}
