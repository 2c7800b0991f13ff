use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, Utc};
use log::*;

use crate::{
    db_types::{OtpChallenge, OtpCheck},
    engine_api::otp_objects::{OtpConfig, OtpIssued, OtpSender},
    helpers::{hash_otp, new_otp_code, normalize_phone, Clock, SystemClock},
    traits::{OtpError, OtpManagement},
};

/// Short-lived one-time codes for phone verification.
///
/// Per phone, a challenge moves from NONE to ISSUED on request and from there to VERIFIED (correct code), EXPIRED
/// (TTL elapsed) or LOCKED (too many wrong codes). Verified and locked challenges are deleted, and expired ones are
/// treated as absent, so all three end states look like NONE to the next request.
#[derive(Clone)]
pub struct OtpApi<B, S> {
    db: B,
    sender: S,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
}

impl<B, S> Debug for OtpApi<B, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OtpApi ({:?})", self.config)
    }
}

impl<B, S> OtpApi<B, S> {
    pub fn new(db: B, sender: S, config: OtpConfig) -> Self {
        Self { db, sender, config, clock: Arc::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }
}

fn millis(d: std::time::Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

impl<B, S> OtpApi<B, S>
where
    B: OtpManagement,
    S: OtpSender,
{
    /// Issues a fresh code for the phone, replacing any outstanding one, and hands it to the sender.
    ///
    /// Fails with [`OtpError::RateLimitExceeded`] once the phone has used up its requests for the current window. The
    /// error says how long until the window resets. A failure to deliver the code is logged, but the code stays valid.
    pub async fn request_otp(&self, phone: &str) -> Result<OtpIssued, OtpError> {
        let phone = normalize_phone(phone).ok_or_else(|| OtpError::InvalidPhone(phone.to_string()))?;
        let now = self.clock.now().timestamp_millis();
        let window = self.db.record_otp_request(&phone, now, millis(self.config.rate_window)).await?;
        if window.request_count > self.config.max_requests {
            let remaining_ms = (window.expires_at - now).max(0);
            let retry_after_secs = (remaining_ms + 999) / 1000;
            info!("🔑️ OTP rate limit hit for {phone}. Window resets in {retry_after_secs}s");
            return Err(OtpError::RateLimitExceeded { limit: self.config.max_requests, retry_after_secs });
        }
        let code = new_otp_code();
        let expires_at = now + millis(self.config.ttl);
        let challenge = OtpChallenge {
            phone: phone.clone(),
            code_hash: hash_otp(&phone, &code),
            failed_attempts: 0,
            created_at: now,
            expires_at,
        };
        self.db.store_challenge(challenge).await?;
        debug!("🔑️ OTP issued for {phone} ({} of {} this window)", window.request_count, self.config.max_requests);
        let message = self.config.render_message(&code);
        if let Err(e) = self.sender.send_otp(&phone, &code, &message).await {
            warn!("🔑️ OTP for {phone} was issued but could not be delivered. {e}");
        }
        let expires_at = DateTime::<Utc>::from_timestamp_millis(expires_at).unwrap_or_default();
        Ok(OtpIssued { phone, expires_at })
    }

    /// Checks `code` against the phone's outstanding challenge. A correct code consumes the challenge.
    ///
    /// * [`OtpError::OtpExpired`] if there is no live challenge, or it had already used up its attempts. In the latter
    ///   case the challenge is discarded.
    /// * [`OtpError::InvalidOtp`] on a wrong code, with the number of attempts left.
    pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<(), OtpError> {
        let phone = normalize_phone(phone).ok_or_else(|| OtpError::InvalidPhone(phone.to_string()))?;
        let now = self.clock.now().timestamp_millis();
        let code_hash = hash_otp(&phone, code);
        match self.db.check_challenge(&phone, &code_hash, self.config.max_attempts, now).await? {
            OtpCheck::Verified => {
                info!("🔑️ OTP verified for {phone}");
                Ok(())
            },
            OtpCheck::Missing => {
                debug!("🔑️ No live OTP for {phone}");
                Err(OtpError::OtpExpired)
            },
            OtpCheck::Locked => {
                info!("🔑️ OTP for {phone} discarded after {} failed attempts", self.config.max_attempts);
                Err(OtpError::OtpExpired)
            },
            OtpCheck::Mismatch { failed_attempts } => {
                let attempts_remaining = (self.config.max_attempts - failed_attempts).max(0);
                debug!("🔑️ Wrong OTP for {phone}. {attempts_remaining} attempts remaining");
                Err(OtpError::InvalidOtp { attempts_remaining })
            },
        }
    }

    /// Removes expired challenges and rate windows. Expired rows are already ignored by every read, so this is only
    /// housekeeping.
    pub async fn purge_expired(&self) -> Result<u64, OtpError> {
        let now = self.clock.now().timestamp_millis();
        let removed = self.db.purge_expired(now).await?;
        debug!("🔑️ Purged {removed} expired OTP records");
        Ok(removed)
    }
}
