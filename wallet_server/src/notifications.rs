//! Event hooks registered by the server.
//!
//! Customer push notifications are not wired up yet, so for now both hooks write to the notification log target
//! (`gw::notifications`). Swapping in a real notifier only means replacing the closures below.
use log::*;
use wallet_engine::events::{EventHandlers, EventHooks, OrderSettledEvent, WalletCreditedEvent};

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 100;

pub fn create_notification_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_settled(|ev| {
        let OrderSettledEvent { order } = ev;
        Box::pin(async move {
            info!(
                target: "gw::notifications",
                "📦️ Order {} confirmed for user #{}. {} paid. Delivery: {}",
                order.id,
                order.user_id,
                order.total,
                order.delivery_estimate
            );
        })
    });
    hooks.on_wallet_credited(|ev| {
        let WalletCreditedEvent { user_id, transaction_type, new_balance, .. } = ev;
        Box::pin(async move {
            info!(
                target: "gw::notifications",
                "💰️ Wallet of user #{user_id} credited ({transaction_type}). New balance: {new_balance}"
            );
        })
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}
