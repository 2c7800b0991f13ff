use std::time::Duration;

use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use wallet_engine::{
    db_types::{CreditRequest, Kobo, NewUser, TransactionType, User},
    LedgerStore,
    SqliteDatabase,
    WalletManagement,
};

pub fn random_db_path() -> String {
    format!("sqlite://{}/gw_it_store_{:016x}.db", std::env::temp_dir().display(), rand::random::<u64>())
}

pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    Sqlite::create_database(url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(url, 25, Duration::from_secs(10)).await.expect("Error opening database");
    db.migrate().await.expect("Error running DB migrations");
    info!("🚀️ Test database ready at {url}");
    db
}

pub async fn setup() -> SqliteDatabase {
    prepare_test_env(&random_db_path()).await
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Failed to drop test database {url}: {e}");
    }
}

pub async fn funded_user(db: &SqliteDatabase, user: NewUser, balance: i64) -> User {
    let user = db.create_user(user).await.expect("Error creating user");
    if balance > 0 {
        let credit =
            CreditRequest::new(user.id, Kobo::from(balance), TransactionType::CreditTransfer, "Opening balance")
                .with_reference(format!("opening_{}", user.id));
        db.credit(credit).await.expect("Error funding wallet");
    }
    db.fetch_user(user.id).await.expect("Error fetching user").expect("User does not exist")
}

/// Asserts that the cached balance equals the sum of the ledger, and returns the balance.
pub async fn assert_consistent(db: &SqliteDatabase, user_id: i64) -> Kobo {
    let audit = db.audit_balance(user_id).await.expect("Error auditing balance");
    assert!(audit.is_consistent(), "Balance and ledger disagree: {audit:?}");
    audit.stored_balance
}
