use async_trait::async_trait;

use crate::{
    db_types::{Order, OrderId, OrderSettlement},
    traits::WalletError,
};

#[async_trait]
pub trait OrderManagement: Send + Sync {
    /// Settles a priced order in one unit of work: debits the user by the order total under the order's debit
    /// reference, stores the order and its items, and links the order to the debit transaction.
    ///
    /// Any failure, including [`WalletError::InsufficientBalance`], leaves no trace in the store.
    async fn settle_order(&self, settlement: OrderSettlement) -> Result<Order, WalletError>;

    /// Fetches the order, with its line items.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, WalletError>;

    /// All of the user's orders, newest first, with their line items.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, WalletError>;

    async fn count_orders_for_user(&self, user_id: i64) -> Result<i64, WalletError>;
}
