//! Payloads sent by the payment provider's webhooks.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db_types::{CreditResult, TransactionType};

pub const DEDICATED_ACCOUNT_CREDIT: &str = "dedicated_account.credit";
pub const CHARGE_SUCCESS: &str = "charge.success";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaystackEvent {
    pub event: String,
    pub data: PaystackEventData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaystackEventData {
    /// Amount in kobo
    pub amount: i64,
    pub reference: String,
    #[serde(default)]
    pub customer: Option<PaystackCustomer>,
    /// Free-form metadata attached when the payment was initiated. The engine only looks at `user_id`.
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaystackCustomer {
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl PaystackEvent {
    /// The ledger transaction type this event credits, or `None` if the event is not a credit.
    pub fn credit_type(&self) -> Option<TransactionType> {
        match self.event.as_str() {
            DEDICATED_ACCOUNT_CREDIT => Some(TransactionType::CreditTransfer),
            CHARGE_SUCCESS => Some(TransactionType::CreditCard),
            _ => None,
        }
    }

    /// `metadata.user_id`, which may arrive as a number or a numeric string.
    pub fn metadata_user_id(&self) -> Option<i64> {
        let user_id = self.data.metadata.as_ref()?.get("user_id")?;
        match user_id {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn customer_code(&self) -> Option<&str> {
        self.data.customer.as_ref().and_then(|c| c.customer_code.as_deref()).filter(|c| !c.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WebhookOutcome {
    Credited(CreditResult),
    /// The event's reference had already been applied. Nothing changed.
    AlreadyProcessed(String),
    /// Not an event type that moves money into a wallet.
    Ignored(String),
}
