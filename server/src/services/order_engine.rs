// server/src/services/order_engine.rs

//! Order writes that span more than one statement, and the status machine.

use crate::db::OrderStore;
use crate::errors::{AppError, Result};
use crate::models::{NewOrder, NewOrderLine, OrderStatus, OrderWithLines};
use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};

/// Writes the header and every line in one transaction. Any failure rolls
/// the whole order back before the error is returned.
#[instrument(name = "order_engine::persist_order", skip_all, fields(order_number = %order.order_number, lines = lines.len()), err(Display))]
pub async fn persist_order(orders: &dyn OrderStore, order: &NewOrder, lines: &[NewOrderLine]) -> Result<i64> {
  let mut tx = orders.begin().await?;

  let written = async {
    let order_id = tx.insert_order(order).await?;
    for line in lines {
      tx.insert_line(order_id, line).await?;
    }
    Ok::<_, AppError>(order_id)
  }
  .await;

  match written {
    Ok(order_id) => {
      tx.commit().await?;
      info!(order_id, "Order committed.");
      Ok(order_id)
    }
    Err(err) => {
      warn!(error = %err, "Order write failed, rolling back.");
      if let Err(rollback_err) = tx.rollback().await {
        error!(error = %rollback_err, "Rollback failed.");
      }
      Err(err)
    }
  }
}

/// Loads an order with its lines. `owner` scopes the lookup to one account,
/// and a miss is always `NotFound`.
pub async fn load_order(orders: &dyn OrderStore, id: i64, owner: Option<i64>) -> Result<OrderWithLines> {
  let order = orders
    .find_order(id, owner)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  let details = orders.order_lines(order.id).await?;
  Ok(OrderWithLines { order, details })
}

/// Completion timestamp that goes with `status`.
pub fn completion_stamp(status: OrderStatus, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
  match status {
    OrderStatus::Completed => Some(now),
    OrderStatus::Queued
    | OrderStatus::Washing
    | OrderStatus::Drying
    | OrderStatus::Ironing
    | OrderStatus::ReadyForPickup
    | OrderStatus::Cancelled => None,
  }
}

/// Moves an order to `status`. Leaving a terminal status is allowed but logged.
#[instrument(name = "order_engine::update_status", skip(orders, status), fields(status = %status), err(Display))]
pub async fn update_status(orders: &dyn OrderStore, id: i64, status: OrderStatus) -> Result<OrderWithLines> {
  let current = orders
    .find_order(id, None)
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  if current.status.is_terminal() && current.status != status {
    warn!(from = %current.status, to = %status, "Order is leaving a terminal status.");
  }

  orders.set_status(id, status, completion_stamp(status, Utc::now())).await?;
  info!(from = %current.status, "Order status updated.");
  load_order(orders, id, None).await
}

/// Customer-side cancellation, only while the order is still queued.
#[instrument(name = "order_engine::cancel_for_customer", skip(orders), err(Display))]
pub async fn cancel_for_customer(orders: &dyn OrderStore, id: i64, account_id: i64) -> Result<OrderWithLines> {
  let current = orders
    .find_order(id, Some(account_id))
    .await?
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

  if current.status != OrderStatus::Queued {
    return Err(AppError::BadRequest(format!(
      "Only queued orders can be cancelled (current status: {})",
      current.status
    )));
  }

  orders.set_status(id, OrderStatus::Cancelled, None).await?;
  info!("Order cancelled by its owner.");
  load_order(orders, id, Some(account_id)).await
}
