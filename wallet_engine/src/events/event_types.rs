use serde::{Deserialize, Serialize};

use crate::db_types::{CreditResult, Order, TransactionType};

/// Published once an order and its debit have been committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
}

impl OrderSettledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after a credit has been committed. Replayed credits do not produce an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletCreditedEvent {
    pub user_id: i64,
    pub transaction_id: i64,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub new_balance: gw_common::Kobo,
}

impl WalletCreditedEvent {
    pub fn new(result: &CreditResult, transaction_type: TransactionType, reference: Option<String>) -> Self {
        Self {
            user_id: result.entry.user_id,
            transaction_id: result.entry.transaction_id,
            transaction_type,
            reference,
            new_balance: result.entry.new_balance,
        }
    }
}
