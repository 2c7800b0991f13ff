use log::debug;
use sqlx::SqliteConnection;

use super::{is_unique_violation_on, ledger, users};
use crate::{
    db_types::{CreditRequest, CreditResult, Kobo, PaymentIntent, PaymentStatus, TransactionType},
    traits::WalletError,
};

/// Stores a new pending intent. The user's row is locked first, so an unknown user fails with `UserNotFound`.
pub async fn insert_intent(
    user_id: i64,
    amount: Kobo,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<PaymentIntent, WalletError> {
    if !amount.is_positive() {
        return Err(WalletError::InvalidAmount(format!("Payment amount must be positive, but was {amount}")));
    }
    users::lock_user(user_id, conn).await?;
    sqlx::query_as(
        r#"
            INSERT INTO payment_intents (reference, user_id, amount)
            VALUES ($1, $2, $3)
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(user_id)
    .bind(amount)
    .fetch_one(conn)
    .await
    .map_err(|e| {
        if is_unique_violation_on(&e, "payment_intents.reference") {
            WalletError::DuplicateReference(reference.to_string())
        } else {
            WalletError::from(e)
        }
    })
}

pub async fn fetch_intent(reference: &str, conn: &mut SqliteConnection) -> Result<Option<PaymentIntent>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payment_intents WHERE reference = $1").bind(reference).fetch_optional(conn).await
}

async fn set_status(
    reference: &str,
    status: PaymentStatus,
    only_if_pending: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentIntent>, sqlx::Error> {
    sqlx::query_as(
        r#"
            UPDATE payment_intents SET status = $2, updated_at = CURRENT_TIMESTAMP
            WHERE reference = $1 AND ($3 = FALSE OR status = 'PENDING')
            RETURNING *;
        "#,
    )
    .bind(reference)
    .bind(status)
    .bind(only_if_pending)
    .fetch_optional(conn)
    .await
}

/// Marks the intent as completed and credits its stored amount to its stored user, keyed on the intent's reference.
///
/// The status update is the first write of the unit. A second completion of the same intent finds the reference
/// already applied and returns the original credit with `replayed` set.
pub async fn complete(
    reference: &str,
    description: &str,
    conn: &mut SqliteConnection,
) -> Result<(PaymentIntent, CreditResult), WalletError> {
    let intent = set_status(reference, PaymentStatus::Completed, false, conn)
        .await?
        .ok_or_else(|| WalletError::PaymentNotFound(reference.to_string()))?;
    let request = CreditRequest::new(intent.user_id, intent.amount, TransactionType::CreditCard, description)
        .with_reference(intent.reference.as_str());
    let credit = ledger::apply_credit(&request, conn).await?;
    debug!("🗃️ Payment {reference} completed for user #{}. Replayed: {}", intent.user_id, credit.replayed);
    Ok((intent, credit))
}

/// Records a cancelled or failed outcome. Only pending intents change; a completed payment stays completed.
pub async fn close(
    reference: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<PaymentIntent, WalletError> {
    match set_status(reference, status, true, conn).await? {
        Some(intent) => Ok(intent),
        None => fetch_intent(reference, conn).await?.ok_or_else(|| WalletError::PaymentNotFound(reference.to_string())),
    }
}
