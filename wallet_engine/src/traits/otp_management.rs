use async_trait::async_trait;
use thiserror::Error;

use crate::{
    db_types::{OtpChallenge, OtpCheck, RateWindow},
    traits::StoreTimeout,
};

/// Storage for OTP challenges and issuance rate windows, keyed by phone number.
///
/// All timestamps are unix epoch milliseconds supplied by the caller. Rows whose `expires_at` is not in the future are
/// treated as absent by every read.
#[async_trait]
pub trait OtpManagement: Send + Sync {
    /// Increments the phone's request counter and returns the updated window, as one atomic statement.
    ///
    /// If there is no live window, a new one is started with a count of 1 that expires `window_ms` after `now`.
    async fn record_otp_request(&self, phone: &str, now: i64, window_ms: i64) -> Result<RateWindow, OtpError>;

    /// Stores the challenge, replacing any prior challenge for the same phone.
    async fn store_challenge(&self, challenge: OtpChallenge) -> Result<(), OtpError>;

    /// Checks `code_hash` against the phone's live challenge in a single unit of work.
    ///
    /// * A challenge that has reached `max_attempts` failures is deleted and reported as [`OtpCheck::Locked`].
    /// * A mismatch increments the failure counter in place, leaving the expiry untouched.
    /// * A match deletes the challenge.
    async fn check_challenge(
        &self,
        phone: &str,
        code_hash: &str,
        max_attempts: i64,
        now: i64,
    ) -> Result<OtpCheck, OtpError>;

    /// Deletes expired challenges and rate windows. Returns the number of rows removed.
    async fn purge_expired(&self, now: i64) -> Result<u64, OtpError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OtpError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("{0}")]
    StoreTimeout(#[from] StoreTimeout),
    #[error("The OTP has expired or was never issued. Request a new one.")]
    OtpExpired,
    #[error("The OTP is incorrect. {attempts_remaining} attempts remaining.")]
    InvalidOtp { attempts_remaining: i64 },
    #[error("Too many OTP requests. A maximum of {limit} are allowed. Try again in {retry_after_secs} seconds.")]
    RateLimitExceeded { limit: i64, retry_after_secs: i64 },
    #[error("{0} is not a valid phone number")]
    InvalidPhone(String),
}

impl From<sqlx::Error> for OtpError {
    fn from(e: sqlx::Error) -> Self {
        OtpError::DatabaseError(e.to_string())
    }
}
