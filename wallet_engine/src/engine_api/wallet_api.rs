use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{
        BalanceAudit,
        CreditRequest,
        CreditResult,
        DebitRequest,
        Kobo,
        LedgerEntry,
        NewUser,
        TransactionType,
        User,
        WalletTransaction,
    },
    events::{EventProducers, WalletCreditedEvent},
    traits::{IdempotencyGuard, WalletError, WalletManagement},
};

/// Balance queries and balance-changing operations for a single user's wallet.
///
/// Every mutation is one atomic unit of work in the store. Debits are linearizable per user, and credits carrying a
/// reference are applied at most once, however many times they are delivered.
#[derive(Clone)]
pub struct WalletApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for WalletApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WalletApi ({:?})", self.db)
    }
}

impl<B> WalletApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> WalletApi<B>
where B: WalletManagement + IdempotencyGuard
{
    pub async fn create_user(&self, user: NewUser) -> Result<User, WalletError> {
        if let Some(code) = user.referred_by.as_deref() {
            if self.db.fetch_user_by_referral_code(code).await?.is_none() {
                warn!("💰️ New user was referred with code {code}, which does not belong to anyone");
            }
        }
        let user = self.db.create_user(user).await?;
        info!("💰️ Wallet opened for user #{}", user.id);
        Ok(user)
    }

    pub async fn user(&self, user_id: i64) -> Result<User, WalletError> {
        self.db.fetch_user(user_id).await?.ok_or(WalletError::UserNotFound(user_id))
    }

    pub async fn get_balance(&self, user_id: i64) -> Result<Kobo, WalletError> {
        self.db.fetch_balance(user_id).await
    }

    /// Takes `amount` from the user's wallet. Fails with [`WalletError::InsufficientBalance`], and changes nothing, if
    /// the wallet does not hold enough.
    pub async fn debit(
        &self,
        user_id: i64,
        amount: Kobo,
        reference: Option<String>,
        description: &str,
    ) -> Result<LedgerEntry, WalletError> {
        let request = DebitRequest { user_id, amount, reference, description: description.to_string() };
        let entry = self.db.debit(request).await?;
        debug!("💰️ User #{user_id} debited {amount}. Balance is now {}", entry.new_balance);
        Ok(entry)
    }

    /// Adds `amount` to the user's wallet.
    ///
    /// If `reference` has been applied before, the original result is returned with `replayed` set, and the wallet
    /// is not credited again.
    pub async fn credit(
        &self,
        user_id: i64,
        amount: Kobo,
        transaction_type: TransactionType,
        reference: Option<String>,
        description: &str,
    ) -> Result<CreditResult, WalletError> {
        let request = CreditRequest {
            user_id,
            amount,
            transaction_type,
            reference: reference.clone(),
            description: description.to_string(),
        };
        let result = self.db.credit(request).await?;
        if result.replayed {
            info!("💰️ Credit {} for user #{user_id} was already applied. Ignoring it.", reference.unwrap_or_default());
        } else {
            debug!("💰️ User #{user_id} credited {amount} ({transaction_type}). Balance is now {}", result.entry.new_balance);
            let event = WalletCreditedEvent::new(&result, transaction_type, reference);
            self.producers.publish_wallet_credited(event).await;
        }
        Ok(result)
    }

    /// True if the external reference has already been applied to the ledger.
    pub async fn has_applied(&self, reference: &str) -> Result<bool, WalletError> {
        Ok(self.db.has_applied(reference).await?.is_some())
    }

    /// The user's ledger, newest first.
    pub async fn transactions(&self, user_id: i64) -> Result<Vec<WalletTransaction>, WalletError> {
        if self.db.fetch_user(user_id).await?.is_none() {
            return Err(WalletError::UserNotFound(user_id));
        }
        self.db.fetch_transactions_for_user(user_id).await
    }

    /// Checks that the cached balance matches the ledger. A mismatch is logged as an error.
    pub async fn audit(&self, user_id: i64) -> Result<BalanceAudit, WalletError> {
        let audit = self.db.audit_balance(user_id).await?;
        if !audit.is_consistent() {
            error!(
                "💰️ Balance for user #{user_id} is {}, but the ledger ({} transactions) sums to {}",
                audit.stored_balance, audit.transaction_count, audit.ledger_total
            );
        }
        Ok(audit)
    }
}
