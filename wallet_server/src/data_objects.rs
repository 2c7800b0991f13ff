use std::fmt::Display;

use serde::{Deserialize, Serialize};
use wallet_engine::{
    db_types::{CreditResult, Kobo, PaymentStatus},
    PaymentOutcome,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub user_id: i64,
    pub balance: Kobo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub user_id: i64,
    pub amount: Kobo,
    #[serde(default)]
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The checkout's report for a payment. Only the reference identifies the payment; amount and user are never read
/// from the request.
pub struct CompletePaymentRequest {
    pub reference: String,
    pub outcome: PaymentOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletePaymentResponse {
    pub reference: String,
    pub status: PaymentStatus,
    /// True if this call (or an earlier report of the same payment) credited the wallet.
    pub credited: bool,
    #[serde(default)]
    pub credit: Option<CreditResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRequest {
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpVerification {
    pub phone: String,
    pub code: String,
}

/// The only body the payment provider ever gets back from a webhook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
}

impl WebhookAck {
    pub fn success() -> Self {
        Self { status: "success".to_string() }
    }
}
