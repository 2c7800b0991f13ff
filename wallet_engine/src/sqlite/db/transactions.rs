use sqlx::{FromRow, SqliteConnection};

use super::is_unique_violation_on;
use crate::{
    db_types::{Kobo, TransactionType, WalletTransaction},
    traits::WalletError,
};

/// Appends an entry to the ledger. This does not touch the user's balance; see [`super::ledger`] for the operations
/// that keep the two in step.
pub async fn insert_transaction(
    user_id: i64,
    amount: Kobo,
    transaction_type: TransactionType,
    reference: Option<&str>,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<WalletTransaction, WalletError> {
    sqlx::query_as(
        r#"
            INSERT INTO wallet_transactions (user_id, amount, transaction_type, reference, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *;
        "#,
    )
    .bind(user_id)
    .bind(amount)
    .bind(transaction_type)
    .bind(reference)
    .bind(description)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "wallet_transactions.reference") {
            WalletError::DuplicateReference(reference.unwrap_or_default().to_string())
        } else {
            WalletError::from(e)
        }
    })
}

/// The user's transactions, newest first.
pub async fn fetch_transactions_for_user(
    user_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<WalletTransaction>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM wallet_transactions WHERE user_id = $1 ORDER BY id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

#[derive(Debug, Clone, Copy, FromRow)]
pub struct LedgerTotal {
    pub total: Kobo,
    pub count: i64,
}

/// The sum and number of the user's transactions.
pub async fn ledger_total(user_id: i64, conn: &mut SqliteConnection) -> Result<LedgerTotal, sqlx::Error> {
    sqlx::query_as(
        "SELECT COALESCE(SUM(amount), 0) AS total, COUNT(*) AS count FROM wallet_transactions WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(conn)
    .await
}
