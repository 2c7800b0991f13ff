use log::debug;
use sqlx::SqliteConnection;

use super::ledger;
use crate::{
    db_types::{DebitRequest, Kobo, Order, OrderId, OrderItem, OrderSettlement},
    traits::WalletError,
};

/// Debits the user for the order and stores the order with its items, linked to the debit transaction.
///
/// Run this inside a transaction. If any step fails the caller rolls back and neither the debit nor the order exist.
pub async fn settle(settlement: &OrderSettlement, conn: &mut SqliteConnection) -> Result<Order, WalletError> {
    if settlement.items.is_empty() {
        return Err(WalletError::EmptyCart);
    }
    let line_sum: Kobo = settlement.items.iter().map(|i| i.line_total).sum();
    if line_sum != settlement.total {
        return Err(WalletError::InvalidAmount(format!(
            "Order total {} does not match the sum of its lines ({line_sum})",
            settlement.total
        )));
    }
    let debit = DebitRequest::new(settlement.user_id, settlement.total, settlement.description.as_str())
        .with_reference(settlement.order_id.debit_reference());
    let entry = ledger::apply_debit(&debit, conn).await?;
    let mut order = insert_order(settlement, entry.transaction_id, conn).await?;
    for item in &settlement.items {
        insert_item(&order.id, item, conn).await?;
    }
    order.items = settlement.items.clone();
    debug!("🗃️ Order {} saved for user #{} against transaction #{}", order.id, order.user_id, entry.transaction_id);
    Ok(order)
}

async fn insert_order(
    settlement: &OrderSettlement,
    transaction_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO orders (id, user_id, total, transaction_id, delivery_estimate, note, address_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(&settlement.order_id)
    .bind(settlement.user_id)
    .bind(settlement.total)
    .bind(transaction_id)
    .bind(&settlement.delivery_estimate)
    .bind(settlement.note.as_deref())
    .bind(settlement.address_id.as_deref())
    .fetch_one(conn)
    .await
}

async fn insert_item(order_id: &OrderId, item: &OrderItem, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO order_items (order_id, item_id, quantity, unit_price, line_total)
            VALUES ($1, $2, $3, $4, $5);
        "#,
    )
    .bind(order_id)
    .bind(&item.item_id)
    .bind(item.quantity)
    .bind(item.unit_price)
    .bind(item.line_total)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_items(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT item_id, quantity, unit_price, line_total FROM order_items WHERE order_id = $1 ORDER BY id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

/// Fetches the order with its line items.
pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(&mut *conn).await?;
    match order {
        Some(mut order) => {
            order.items = fetch_items(&order.id, conn).await?;
            Ok(Some(order))
        },
        None => Ok(None),
    }
}

/// The user's orders, newest first, with their line items.
pub async fn fetch_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut orders: Vec<Order> =
        sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, transaction_id DESC")
            .bind(user_id)
            .fetch_all(&mut *conn)
            .await?;
    for order in orders.iter_mut() {
        order.items = fetch_items(&order.id, conn).await?;
    }
    Ok(orders)
}

pub async fn count_orders_for_user(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE user_id = $1").bind(user_id).fetch_one(conn).await
}
