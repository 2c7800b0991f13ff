use async_trait::async_trait;

use crate::{
    db_types::{ReferralBonus, ReferralOutcome},
    traits::WalletError,
};

#[async_trait]
pub trait ReferralManagement: Send + Sync {
    /// Issues both halves of a referral bonus in a single unit of work, or neither.
    ///
    /// The referee's `referral_bonus_issued` flag is checked and set as the first write of the unit. If the flag is
    /// already set, or the referee does not have exactly one order, nothing is credited and the reason is reported as
    /// [`ReferralOutcome::Skipped`].
    async fn issue_referral_bonus(&self, bonus: ReferralBonus) -> Result<ReferralOutcome, WalletError>;
}
