use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_OTP_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_OTP_MAX_ATTEMPTS: i64 = 5;
pub const DEFAULT_OTP_MAX_REQUESTS: i64 = 3;
pub const DEFAULT_OTP_RATE_WINDOW: Duration = Duration::from_secs(600);
pub const DEFAULT_OTP_TEMPLATE: &str = "Your Grocer verification code is {code}. It expires in {minutes} minutes.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// How long an issued code stays valid
    pub ttl: Duration,
    /// Failed verifications allowed before the challenge is discarded
    pub max_attempts: i64,
    /// Codes that may be requested per phone within one rate window
    pub max_requests: i64,
    pub rate_window: Duration,
    /// Message sent to the phone. `{code}` and `{minutes}` are substituted.
    pub message_template: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_OTP_TTL,
            max_attempts: DEFAULT_OTP_MAX_ATTEMPTS,
            max_requests: DEFAULT_OTP_MAX_REQUESTS,
            rate_window: DEFAULT_OTP_RATE_WINDOW,
            message_template: DEFAULT_OTP_TEMPLATE.to_string(),
        }
    }
}

impl OtpConfig {
    pub fn render_message(&self, code: &str) -> String {
        let minutes = self.ttl.as_secs().div_ceil(60);
        self.message_template.replace("{code}", code).replace("{minutes}", &minutes.to_string())
    }
}

/// Confirmation that a code has been issued. The code itself only ever goes to the phone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpIssued {
    pub phone: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Error)]
#[error("Could not deliver OTP: {0}")]
pub struct OtpDeliveryError(pub String);

/// The transport that gets a code to the user's phone.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpSender: Send + Sync {
    async fn send_otp(&self, phone: &str, code: &str, message: &str) -> Result<(), OtpDeliveryError>;
}

/// Logs codes instead of sending them. For development and staging.
#[derive(Debug, Clone, Copy, Default)]
pub struct SandboxOtpSender;

#[async_trait]
impl OtpSender for SandboxOtpSender {
    async fn send_otp(&self, phone: &str, code: &str, message: &str) -> Result<(), OtpDeliveryError> {
        info!("🔑️ [sandbox] OTP {code} for {phone}: {message}");
        Ok(())
    }
}
