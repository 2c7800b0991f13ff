use log::debug;
use sqlx::SqliteConnection;

use super::{ledger, users};
use crate::{
    db_types::{CreditRequest, ReferralBonus, ReferralOutcome, ReferralSkipReason, TransactionType},
    traits::WalletError,
};

/// Sets the referee's `referral_bonus_issued` flag, provided it is not set yet and the referee has exactly one order.
/// Returns false if the flag could not be claimed.
pub async fn claim_bonus_flag(referee_id: i64, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let claimed: Option<i64> = sqlx::query_scalar(
        r#"
            UPDATE users SET referral_bonus_issued = TRUE, updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
              AND referral_bonus_issued = FALSE
              AND (SELECT COUNT(*) FROM orders WHERE orders.user_id = users.id) = 1
            RETURNING id;
        "#,
    )
    .bind(referee_id)
    .fetch_optional(conn)
    .await?;
    Ok(claimed.is_some())
}

async fn skip_reason(referee_id: i64, conn: &mut SqliteConnection) -> Result<ReferralSkipReason, WalletError> {
    let user = users::fetch_user(referee_id, conn).await?.ok_or(WalletError::UserNotFound(referee_id))?;
    let reason = if user.referral_bonus_issued {
        ReferralSkipReason::AlreadyIssued
    } else if user.referred_by.is_none() {
        ReferralSkipReason::NoReferrer
    } else {
        ReferralSkipReason::NotFirstOrder
    };
    Ok(reason)
}

/// Claims the referee's bonus flag and credits both parties. Run inside a transaction: if either credit fails, the
/// flag and the other credit must be rolled back with it.
pub async fn issue(bonus: &ReferralBonus, conn: &mut SqliteConnection) -> Result<ReferralOutcome, WalletError> {
    if !claim_bonus_flag(bonus.referee_id, conn).await? {
        let reason = skip_reason(bonus.referee_id, conn).await?;
        debug!("🗃️ Referral bonus for user #{} not claimed: {reason}", bonus.referee_id);
        return Ok(ReferralOutcome::Skipped(reason));
    }
    let referrer_credit = CreditRequest::new(
        bonus.referrer_id,
        bonus.referrer_credit,
        TransactionType::CreditReferral,
        format!("Referral bonus for inviting user #{}", bonus.referee_id),
    )
    .with_reference(bonus.referrer_reference.as_str());
    let referee_credit = CreditRequest::new(
        bonus.referee_id,
        bonus.referee_credit,
        TransactionType::CreditReferral,
        "Welcome bonus for joining with a referral code",
    )
    .with_reference(bonus.referee_reference.as_str());
    let referrer = ledger::apply_credit(&referrer_credit, conn).await?;
    let referee = ledger::apply_credit(&referee_credit, conn).await?;
    if referrer.replayed || referee.replayed {
        return Err(WalletError::DuplicateReference(format!(
            "{} / {}",
            bonus.referrer_reference, bonus.referee_reference
        )));
    }
    Ok(ReferralOutcome::Issued { referrer: referrer.entry, referee: referee.entry })
}
