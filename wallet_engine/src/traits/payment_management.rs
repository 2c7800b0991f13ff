use async_trait::async_trait;

use crate::{
    db_types::{CreditResult, Kobo, PaymentIntent, PaymentStatus},
    traits::WalletError,
};

/// Card payment intents and their settlement.
#[async_trait]
pub trait PaymentManagement: Send + Sync {
    /// Stores a pending intent for `amount` to be collected from the user under `reference`.
    ///
    /// Fails with [`WalletError::UserNotFound`] for an unknown user and [`WalletError::DuplicateReference`] if the
    /// reference is already in use.
    async fn insert_payment_intent(
        &self,
        user_id: i64,
        amount: Kobo,
        reference: &str,
    ) -> Result<PaymentIntent, WalletError>;

    async fn fetch_payment_intent(&self, reference: &str) -> Result<Option<PaymentIntent>, WalletError>;

    /// In one unit of work, marks the intent completed and credits the stored amount to the stored user, keyed on the
    /// intent's reference. Repeating the call returns the original credit with `replayed` set.
    ///
    /// Fails with [`WalletError::PaymentNotFound`] if no intent was stored under `reference`.
    async fn complete_payment_intent(
        &self,
        reference: &str,
        description: &str,
    ) -> Result<(PaymentIntent, CreditResult), WalletError>;

    /// Moves a pending intent to `status` without touching the ledger, and returns the intent as stored afterwards.
    async fn close_payment_intent(&self, reference: &str, status: PaymentStatus) -> Result<PaymentIntent, WalletError>;
}
