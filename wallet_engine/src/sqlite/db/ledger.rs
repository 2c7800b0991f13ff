//! Balance-changing operations. Each one keeps the cached balance and the ledger in step, and must be run inside a
//! transaction so that the balance write and the ledger append commit together.
use log::{debug, warn};
use sqlx::SqliteConnection;

use super::{idempotency, transactions, users};
use crate::{
    db_types::{CreditRequest, CreditResult, DebitRequest, Kobo, LedgerEntry, TransactionType},
    traits::WalletError,
};

fn validate_amount(amount: Kobo) -> Result<(), WalletError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(WalletError::InvalidAmount(format!("Amount must be positive, but was {amount}")))
    }
}

/// Takes `amount` from the user's wallet and appends a negative `DebitOrder` transaction.
///
/// The balance check and decrement are a single conditional update, which is also the first write of the unit.
pub async fn apply_debit(request: &DebitRequest, conn: &mut SqliteConnection) -> Result<LedgerEntry, WalletError> {
    validate_amount(request.amount)?;
    let new_balance = users::try_decrement_balance(request.user_id, request.amount, conn).await?;
    let tx = transactions::insert_transaction(
        request.user_id,
        -request.amount,
        TransactionType::DebitOrder,
        request.reference.as_deref(),
        &request.description,
        conn,
    )
    .await?;
    debug!("🗃️ User #{} debited {}. Transaction #{}. New balance {new_balance}", request.user_id, request.amount, tx.id);
    Ok(LedgerEntry { user_id: request.user_id, transaction_id: tx.id, new_balance })
}

/// Adds `amount` to the user's wallet and appends a positive transaction of the requested type.
///
/// When the request carries a reference, the idempotency record is consulted after the user's row has been locked, and
/// written alongside the ledger entry. A reference that was applied before yields the recorded result and changes
/// nothing.
pub async fn apply_credit(request: &CreditRequest, conn: &mut SqliteConnection) -> Result<CreditResult, WalletError> {
    if !request.transaction_type.is_credit() {
        return Err(WalletError::InvalidTransactionType(request.transaction_type));
    }
    validate_amount(request.amount)?;
    users::lock_user(request.user_id, conn).await?;
    if let Some(reference) = request.reference.as_deref() {
        if let Some(prior) = idempotency::fetch_applied(reference, conn).await? {
            if prior.user_id != request.user_id {
                warn!(
                    "🗃️ Reference {reference} was applied to user #{}, but is now being replayed for user #{}",
                    prior.user_id, request.user_id
                );
            }
            debug!("🗃️ Reference {reference} has already been applied. Nothing to do.");
            return Ok(CreditResult::replayed(prior.to_entry()));
        }
    }
    let new_balance = users::increment_balance(request.user_id, request.amount, conn).await?;
    let tx = transactions::insert_transaction(
        request.user_id,
        request.amount,
        request.transaction_type,
        request.reference.as_deref(),
        &request.description,
        conn,
    )
    .await?;
    let entry = LedgerEntry { user_id: request.user_id, transaction_id: tx.id, new_balance };
    if let Some(reference) = request.reference.as_deref() {
        idempotency::mark_applied(reference, &entry, conn).await?;
    }
    debug!(
        "🗃️ User #{} credited {} ({}). Transaction #{}. New balance {new_balance}",
        request.user_id, request.amount, request.transaction_type, tx.id
    );
    Ok(CreditResult::applied(entry))
}
