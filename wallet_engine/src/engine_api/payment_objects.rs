use serde::{Deserialize, Serialize};

use crate::db_types::{CreditResult, PaymentIntent};

/// The result the checkout widget reports back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Success { reference: String, message: Option<String> },
    Cancelled,
    Failed { message: String },
}

/// The intent as stored after an outcome was applied, and the credit if the payment succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCompletion {
    pub intent: PaymentIntent,
    pub credit: Option<CreditResult>,
}
