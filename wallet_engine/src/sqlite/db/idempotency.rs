use sqlx::SqliteConnection;

use super::is_unique_violation_on;
use crate::{
    db_types::{AppliedReference, LedgerEntry},
    traits::WalletError,
};

pub async fn fetch_applied(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<AppliedReference>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM applied_references WHERE reference = $1")
        .bind(reference)
        .fetch_optional(conn)
        .await
}

/// Records that `reference` has been applied with the given result. Must run in the same unit of work as the ledger
/// write it describes.
pub async fn mark_applied(
    reference: &str,
    entry: &LedgerEntry,
    conn: &mut SqliteConnection,
) -> Result<(), WalletError> {
    sqlx::query(
        r#"
            INSERT INTO applied_references (reference, user_id, transaction_id, balance_after)
            VALUES ($1, $2, $3, $4);
        "#,
    )
    .bind(reference)
    .bind(entry.user_id)
    .bind(entry.transaction_id)
    .bind(entry.new_balance)
    .execute(conn)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "applied_references.reference") {
            WalletError::DuplicateReference(reference.to_string())
        } else {
            WalletError::from(e)
        }
    })?;
    Ok(())
}
