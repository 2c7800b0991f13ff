use std::{fmt::Debug, sync::Arc};

use log::*;
use tokio::task::JoinHandle;

use crate::{
    db_types::{Kobo, NewOrder, NewOrderItem, Order, OrderId, OrderItem, OrderSettlement, ReferralOutcome},
    engine_api::referral_api::{ReferralApi, ReferralConfig},
    events::{EventProducers, OrderSettledEvent},
    helpers::{delivery_estimate, Clock, SystemClock},
    traits::{LedgerStore, OrderManagement, WalletError},
};

/// `OrderFlowApi` turns a cart into a confirmed, paid-for order.
///
/// Settlement is a single unit of work: the wallet debit, the order and its items are stored together or not at all.
/// The referral bonus check runs afterwards on its own task and can never undo or fail the order.
#[derive(Clone)]
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
    referrals: ReferralApi<B>,
    clock: Arc<dyn Clock>,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self::with_referral_config(db, producers, ReferralConfig::default())
    }

    pub fn with_referral_config(db: B, producers: EventProducers, config: ReferralConfig) -> Self {
        let referrals = ReferralApi::new(db.clone(), producers.clone(), config);
        Self { db, producers, referrals, clock: Arc::new(SystemClock) }
    }

    /// Replaces the wall clock used for delivery estimates and referral references.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.referrals = self.referrals.with_clock(clock.clone());
        self.clock = clock;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Prices the cart from quantities and unit prices. Whatever totals the client had in mind are not consulted.
pub fn price_items(items: &[NewOrderItem]) -> Result<(Vec<OrderItem>, Kobo), WalletError> {
    if items.is_empty() {
        return Err(WalletError::EmptyCart);
    }
    let mut total = Kobo::default();
    let mut priced = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity <= 0 {
            return Err(WalletError::InvalidAmount(format!(
                "Quantity for {} must be positive, but was {}",
                item.item_id, item.quantity
            )));
        }
        if item.unit_price < Kobo::default() {
            return Err(WalletError::InvalidAmount(format!("Unit price for {} cannot be negative", item.item_id)));
        }
        let line_total = item
            .unit_price
            .checked_mul(item.quantity)
            .ok_or_else(|| WalletError::InvalidAmount(format!("Line total for {} is too large", item.item_id)))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| WalletError::InvalidAmount("Order total is too large".to_string()))?;
        priced.push(OrderItem {
            item_id: item.item_id.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total,
        });
    }
    if !total.is_positive() {
        return Err(WalletError::InvalidAmount("Order total must be positive".to_string()));
    }
    Ok((priced, total))
}

impl<B> OrderFlowApi<B>
where B: LedgerStore
{
    /// Places the order and pays for it from the user's wallet.
    ///
    /// Fails with [`WalletError::EmptyCart`], [`WalletError::InvalidAmount`], [`WalletError::UserNotFound`] or
    /// [`WalletError::InsufficientBalance`] and leaves no order or transaction behind when it does. On success the
    /// order is `Confirmed` and a referral bonus check has been scheduled for the user.
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, WalletError> {
        let order = self.settle(order).await?;
        let _referral_check = self.spawn_referral_check(order.user_id);
        Ok(order)
    }

    /// Everything [`Self::place_order`] does, except the referral check.
    pub async fn settle(&self, order: NewOrder) -> Result<Order, WalletError> {
        let (items, total) = price_items(&order.items)?;
        let order_id = OrderId::random();
        let placed_at = self.clock.now();
        let settlement = OrderSettlement {
            description: format!("Payment for order {order_id}"),
            order_id,
            user_id: order.user_id,
            items,
            total,
            delivery_estimate: delivery_estimate(placed_at).to_string(),
            note: order.note,
            address_id: order.address_id,
        };
        let order = self.db.settle_order(settlement).await?;
        info!("📦️ Order {} confirmed for user #{}. {} paid from the wallet", order.id, order.user_id, order.total);
        self.producers.publish_order_settled(OrderSettledEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Runs the referral bonus check for the user on a separate task. Errors are logged and go no further.
    pub fn spawn_referral_check(&self, user_id: i64) -> JoinHandle<()> {
        let referrals = self.referrals.clone();
        tokio::spawn(async move {
            match referrals.maybe_issue_referral_bonus(user_id).await {
                Ok(ReferralOutcome::Issued { .. }) => debug!("📦️ Referral bonus paid out after order for #{user_id}"),
                Ok(ReferralOutcome::Skipped(_)) => {},
                Err(e) => warn!("📦️ Referral bonus check for user #{user_id} failed. The order stands. {e}"),
            }
        })
    }

    pub async fn order(&self, order_id: &OrderId) -> Result<Order, WalletError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| WalletError::OrderNotFound(order_id.clone()))
    }

    pub async fn orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, WalletError> {
        self.db.fetch_orders_for_user(user_id).await
    }
}
