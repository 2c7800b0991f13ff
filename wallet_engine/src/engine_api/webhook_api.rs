use std::fmt::Debug;

use log::*;
use thiserror::Error;

use crate::{
    db_types::Kobo,
    engine_api::{
        wallet_api::WalletApi,
        webhook_objects::{PaystackEvent, WebhookOutcome},
    },
    events::EventProducers,
    traits::{IdempotencyGuard, WalletError, WalletManagement},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Could not match the event to a user: {0}")]
    UnknownUser(String),
    #[error("Malformed webhook event: {0}")]
    MalformedEvent(String),
    #[error("{0}")]
    WalletError(#[from] WalletError),
}

/// Applies payment-provider webhook events to the ledger.
///
/// The caller is expected to have verified the event's signature already. Every credit is keyed on the event's
/// reference, so a provider retrying delivery never credits a wallet twice.
#[derive(Clone)]
pub struct WebhookApi<B> {
    db: B,
    wallet: WalletApi<B>,
}

impl<B: Debug> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi ({:?})", self.db)
    }
}

impl<B: Clone> WebhookApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        let wallet = WalletApi::new(db.clone(), producers);
        Self { db, wallet }
    }
}

impl<B> WebhookApi<B>
where B: WalletManagement + IdempotencyGuard
{
    pub async fn process_event(&self, event: PaystackEvent) -> Result<WebhookOutcome, WebhookError> {
        let Some(transaction_type) = event.credit_type() else {
            debug!("🪝️ Ignoring {} event {}", event.event, event.data.reference);
            return Ok(WebhookOutcome::Ignored(event.event));
        };
        let reference = event.data.reference.trim().to_string();
        if reference.is_empty() {
            return Err(WebhookError::MalformedEvent(format!("{} event has no reference", event.event)));
        }
        if self.db.has_applied(&reference).await?.is_some() {
            info!("🪝️ {} event {reference} has already been processed", event.event);
            return Ok(WebhookOutcome::AlreadyProcessed(reference));
        }
        let user_id = self.resolve_user(&event).await?;
        let amount = Kobo::from(event.data.amount);
        let description = match event.event.as_str() {
            "charge.success" => format!("Card payment {reference}"),
            _ => format!("Bank transfer {reference}"),
        };
        let result = self.wallet.credit(user_id, amount, transaction_type, Some(reference.clone()), &description).await?;
        if result.replayed {
            return Ok(WebhookOutcome::AlreadyProcessed(reference));
        }
        info!("🪝️ {} event {reference} credited {amount} to user #{user_id}", event.event);
        Ok(WebhookOutcome::Credited(result))
    }

    async fn resolve_user(&self, event: &PaystackEvent) -> Result<i64, WebhookError> {
        if let Some(user_id) = event.metadata_user_id() {
            return Ok(user_id);
        }
        let code = event
            .customer_code()
            .ok_or_else(|| WebhookError::UnknownUser(format!("{} has no user id or customer code", event.data.reference)))?;
        self.db
            .fetch_user_by_customer_code(code)
            .await?
            .map(|u| u.id)
            .ok_or_else(|| WebhookError::UnknownUser(format!("No user has customer code {code}")))
    }
}
