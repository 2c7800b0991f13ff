use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Kobo, PaymentIntent, PaymentStatus, TransactionType},
    engine_api::payment_objects::{PaymentCompletion, PaymentOutcome},
    events::{EventProducers, WalletCreditedEvent},
    helpers::new_payment_reference,
    traits::{PaymentManagement, WalletError},
};

/// Wallet top-ups through the in-app card checkout.
///
/// The checkout itself is an external collaborator. [`PaymentApi::initiate`] stores what is to be collected, from whom,
/// and under which reference. The checkout then only reports an outcome against that reference, and
/// [`PaymentApi::complete`] credits the stored amount to the stored user. Only a successful payment touches the
/// ledger.
#[derive(Clone)]
pub struct PaymentApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi ({:?})", self.db)
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentApi<B>
where B: PaymentManagement
{
    /// Records a pending card payment of `amount` for the user. A `pay_` reference is generated unless one is given.
    pub async fn initiate(
        &self,
        user_id: i64,
        amount: Kobo,
        reference: Option<String>,
    ) -> Result<PaymentIntent, WalletError> {
        if !amount.is_positive() {
            return Err(WalletError::InvalidAmount(format!("Payment amount must be positive, but was {amount}")));
        }
        let reference = reference.filter(|r| !r.trim().is_empty()).unwrap_or_else(new_payment_reference);
        let intent = self.db.insert_payment_intent(user_id, amount, &reference).await?;
        debug!("💳️ Payment {reference} of {amount} initiated for user #{user_id}");
        Ok(intent)
    }

    /// Applies the outcome the checkout reported for the payment initiated under `reference`.
    ///
    /// A success credits the amount stored at initiation, keyed on the reference, so reporting the same success twice
    /// is harmless. Cancellations and failures only update the intent. An unknown reference fails with
    /// [`WalletError::PaymentNotFound`] and changes nothing.
    pub async fn complete(&self, reference: &str, outcome: PaymentOutcome) -> Result<PaymentCompletion, WalletError> {
        match outcome {
            PaymentOutcome::Success { reference: reported, message } => {
                if reported != reference {
                    warn!("💳️ Checkout reported success as {reported} for payment {reference}. Crediting {reference}.");
                }
                let description = message.unwrap_or_else(|| "Card payment".to_string());
                let (intent, credit) = self.db.complete_payment_intent(reference, &description).await?;
                if credit.replayed {
                    info!("💳️ Payment {reference} was already completed. Ignoring the repeat.");
                } else {
                    info!("💳️ Payment {reference} completed. User #{} credited {}", intent.user_id, intent.amount);
                    let reference = Some(intent.reference.clone());
                    let event = WalletCreditedEvent::new(&credit, TransactionType::CreditCard, reference);
                    self.producers.publish_wallet_credited(event).await;
                }
                Ok(PaymentCompletion { intent, credit: Some(credit) })
            },
            PaymentOutcome::Cancelled => {
                let intent = self.db.close_payment_intent(reference, PaymentStatus::Cancelled).await?;
                info!("💳️ Payment {reference} was cancelled by user #{}", intent.user_id);
                Ok(PaymentCompletion { intent, credit: None })
            },
            PaymentOutcome::Failed { message } => {
                let intent = self.db.close_payment_intent(reference, PaymentStatus::Failed).await?;
                warn!("💳️ Payment {reference} for user #{} failed: {message}", intent.user_id);
                Ok(PaymentCompletion { intent, credit: None })
            },
        }
    }
}
