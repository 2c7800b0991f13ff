//! Throwaway SQLite databases for tests.
use std::time::Duration;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::{
    db_types::{Kobo, NewUser, TransactionType, User},
    traits::{LedgerStore, WalletManagement},
    SqliteDatabase,
};

pub const TEST_STORE_TIMEOUT: Duration = Duration::from_secs(10);

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/gw_test_store_{:016x}.db", dir.display(), rand::random::<u64>())
}

/// Loads `.env.test`, initialises logging, and creates a fresh, migrated database at `url`.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    let db = SqliteDatabase::new_with_url(url, 25, TEST_STORE_TIMEOUT)
        .await
        .expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
    db
}

/// A fresh, migrated database at a random path.
pub async fn prepare_test_db() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}

/// Closes the store and deletes its database file.
pub async fn teardown(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
}

/// Creates a user and funds the wallet with a transfer credit, so that the ledger explains the balance.
pub async fn user_with_balance(db: &SqliteDatabase, user: NewUser, balance: i64) -> User {
    let user = db.create_user(user).await.expect("Error creating user");
    if balance > 0 {
        let credit = crate::db_types::CreditRequest::new(
            user.id,
            Kobo::from(balance),
            TransactionType::CreditTransfer,
            "Opening balance",
        )
        .with_reference(format!("opening_{}", user.id));
        db.credit(credit).await.expect("Error funding wallet");
    }
    db.fetch_user(user.id).await.expect("Error fetching user").expect("User should exist")
}
