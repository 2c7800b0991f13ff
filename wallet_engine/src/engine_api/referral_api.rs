use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    db_types::{Kobo, ReferralBonus, ReferralOutcome, ReferralSkipReason, TransactionType},
    events::{EventProducers, WalletCreditedEvent},
    helpers::{Clock, SystemClock},
    traits::{OrderManagement, ReferralManagement, WalletError, WalletManagement},
};

pub const DEFAULT_REFERRER_CREDIT: i64 = 50_000;
pub const DEFAULT_REFEREE_CREDIT: i64 = 25_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralConfig {
    /// Paid to the user whose code was used
    pub referrer_credit: Kobo,
    /// Paid to the new user who signed up with the code
    pub referee_credit: Kobo,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self { referrer_credit: Kobo::from(DEFAULT_REFERRER_CREDIT), referee_credit: Kobo::from(DEFAULT_REFEREE_CREDIT) }
    }
}

/// Issues the one-time referral bonus after a referred user's first order.
#[derive(Clone)]
pub struct ReferralApi<B> {
    db: B,
    producers: EventProducers,
    config: ReferralConfig,
    clock: Arc<dyn Clock>,
}

impl<B: Debug> Debug for ReferralApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReferralApi ({:?}, {:?})", self.db, self.config)
    }
}

impl<B> ReferralApi<B> {
    pub fn new(db: B, producers: EventProducers, config: ReferralConfig) -> Self {
        Self { db, producers, config, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ReferralConfig {
        &self.config
    }
}

impl<B> ReferralApi<B>
where B: WalletManagement + OrderManagement + ReferralManagement
{
    /// Credits the referrer and the user, if the user was referred and has just completed their first order.
    ///
    /// Every precondition that does not hold is reported as [`ReferralOutcome::Skipped`] rather than an error. When
    /// the bonus is issued, both credits land in the same unit of work, together with the user's "bonus issued" flag,
    /// so it can never be paid twice.
    pub async fn maybe_issue_referral_bonus(&self, user_id: i64) -> Result<ReferralOutcome, WalletError> {
        let user = self.db.fetch_user(user_id).await?.ok_or(WalletError::UserNotFound(user_id))?;
        if user.referral_bonus_issued {
            return Ok(self.skip(user_id, ReferralSkipReason::AlreadyIssued));
        }
        let Some(code) = user.referred_by.as_deref() else {
            return Ok(self.skip(user_id, ReferralSkipReason::NoReferrer));
        };
        let order_count = self.db.count_orders_for_user(user_id).await?;
        if order_count != 1 {
            return Ok(self.skip(user_id, ReferralSkipReason::NotFirstOrder));
        }
        let referrer = match self.db.fetch_user_by_referral_code(code).await? {
            Some(r) if r.id != user_id => r,
            _ => return Ok(self.skip(user_id, ReferralSkipReason::ReferrerNotFound)),
        };
        let millis = self.clock.now().timestamp_millis();
        let bonus = ReferralBonus {
            referrer_id: referrer.id,
            referee_id: user_id,
            referrer_credit: self.config.referrer_credit,
            referee_credit: self.config.referee_credit,
            referrer_reference: format!("ref_{user_id}_{millis}_referrer"),
            referee_reference: format!("ref_{user_id}_{millis}_referee"),
        };
        let outcome = self.db.issue_referral_bonus(bonus.clone()).await?;
        match &outcome {
            ReferralOutcome::Issued { referrer, referee } => {
                info!(
                    "🎁️ Referral bonus issued. User #{} got {} and user #{user_id} got {}",
                    referrer.user_id, self.config.referrer_credit, self.config.referee_credit
                );
                let credits = [(referrer, bonus.referrer_reference), (referee, bonus.referee_reference)];
                for (entry, reference) in credits {
                    let event = WalletCreditedEvent {
                        user_id: entry.user_id,
                        transaction_id: entry.transaction_id,
                        transaction_type: TransactionType::CreditReferral,
                        reference: Some(reference),
                        new_balance: entry.new_balance,
                    };
                    self.producers.publish_wallet_credited(event).await;
                }
            },
            ReferralOutcome::Skipped(reason) => {
                debug!("🎁️ Referral bonus for user #{user_id} was not issued: {reason}");
            },
        }
        Ok(outcome)
    }

    fn skip(&self, user_id: i64, reason: ReferralSkipReason) -> ReferralOutcome {
        debug!("🎁️ No referral bonus for user #{user_id}: {reason}");
        ReferralOutcome::Skipped(reason)
    }
}
