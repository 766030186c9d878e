// server/src/models/order.rs

use crate::errors::AppError;
use crate::models::service::ServiceUnit;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Decimal places accepted for prices and quantities. Subtotals keep the full product.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
  Queued,
  Washing,
  Drying,
  Ironing,
  ReadyForPickup,
  Completed,
  Cancelled,
}

impl OrderStatus {
  /// Every status, in display order.
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Queued,
    OrderStatus::Washing,
    OrderStatus::Drying,
    OrderStatus::Ironing,
    OrderStatus::ReadyForPickup,
    OrderStatus::Completed,
    OrderStatus::Cancelled,
  ];

  /// The normal path of an order, from intake to pickup.
  pub const LIFECYCLE: [OrderStatus; 6] = [
    OrderStatus::Queued,
    OrderStatus::Washing,
    OrderStatus::Drying,
    OrderStatus::Ironing,
    OrderStatus::ReadyForPickup,
    OrderStatus::Completed,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Queued => "queued",
      OrderStatus::Washing => "washing",
      OrderStatus::Drying => "drying",
      OrderStatus::Ironing => "ironing",
      OrderStatus::ReadyForPickup => "ready_for_pickup",
      OrderStatus::Completed => "completed",
      OrderStatus::Cancelled => "cancelled",
    }
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
  }

  pub fn is_active(&self) -> bool {
    !self.is_terminal()
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    OrderStatus::ALL
      .iter()
      .copied()
      .find(|status| status.as_str().eq_ignore_ascii_case(wanted))
      .ok_or_else(|| AppError::BadRequest(format!("Invalid status '{}'", wanted)))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
  pub id: i64,
  pub order_number: String,
  pub user_id: Option<i64>,
  pub customer_name: String,
  pub phone_number: String,
  pub address: Option<String>,
  pub status: OrderStatus,
  pub total_price: Decimal,
  pub notes: Option<String>,
  pub entry_date: DateTime<Utc>,
  pub completed_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  /// Full name of the owning account, when there is one.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub user_fullname: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderRow {
  pub id: i64,
  pub order_number: String,
  pub user_id: Option<i64>,
  pub customer_name: String,
  pub phone_number: String,
  pub address: Option<String>,
  pub status: String,
  pub total_price: Decimal,
  pub notes: Option<String>,
  pub entry_date: DateTime<Utc>,
  pub completed_date: Option<DateTime<Utc>>,
  pub created_at: DateTime<Utc>,
  pub user_fullname: Option<String>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
    let status = row
      .status
      .parse()
      .map_err(|_| AppError::Internal(format!("Unknown status '{}' stored for order {}", row.status, row.id)))?;
    Ok(Order {
      id: row.id,
      order_number: row.order_number,
      user_id: row.user_id,
      customer_name: row.customer_name,
      phone_number: row.phone_number,
      address: row.address,
      status,
      total_price: row.total_price,
      notes: row.notes,
      entry_date: row.entry_date,
      completed_date: row.completed_date,
      created_at: row.created_at,
      user_fullname: row.user_fullname,
    })
  }
}

/// A line item joined with its catalog entry for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
  pub id: i64,
  pub order_id: i64,
  pub service_id: i64,
  pub service_name: String,
  pub unit: ServiceUnit,
  pub quantity: Decimal,
  pub price: Decimal,
  pub subtotal: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct OrderLineRow {
  pub id: i64,
  pub order_id: i64,
  pub service_id: i64,
  pub service_name: String,
  pub unit: String,
  pub quantity: Decimal,
  pub price: Decimal,
  pub subtotal: Decimal,
}

impl TryFrom<OrderLineRow> for OrderLine {
  type Error = AppError;

  fn try_from(row: OrderLineRow) -> Result<Self, Self::Error> {
    let unit = row
      .unit
      .parse()
      .map_err(|_| AppError::Internal(format!("Unknown unit '{}' stored for service {}", row.unit, row.service_id)))?;
    Ok(OrderLine {
      id: row.id,
      order_id: row.order_id,
      service_id: row.service_id,
      service_name: row.service_name,
      unit,
      quantity: row.quantity,
      price: row.price,
      subtotal: row.subtotal,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderWithLines {
  #[serde(flatten)]
  pub order: Order,
  pub details: Vec<OrderLine>,
}

/// One requested line of a new order, as sent by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderItemInput {
  pub service_id: i64,
  pub quantity: Decimal,
  /// Accepted for compatibility with older clients; the catalog price wins.
  #[serde(default)]
  pub price: Option<Decimal>,
}

/// Header row written by the order transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
  pub order_number: String,
  pub user_id: Option<i64>,
  pub customer_name: String,
  pub phone_number: String,
  pub address: Option<String>,
  pub notes: Option<String>,
  pub status: OrderStatus,
  pub total_price: Decimal,
  pub entry_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderLine {
  pub service_id: i64,
  pub quantity: Decimal,
  pub price: Decimal,
  pub subtotal: Decimal,
}

impl NewOrderLine {
  /// Prices a line. The subtotal is the exact product and is never rounded.
  pub fn priced(service_id: i64, quantity: Decimal, price: Decimal) -> Self {
    let subtotal = quantity * price;
    NewOrderLine {
      service_id,
      quantity,
      price,
      subtotal,
    }
  }
}

/// Sum of the line subtotals, which is what an order's total must equal.
pub fn order_total(lines: &[NewOrderLine]) -> Decimal {
  lines.iter().map(|line| line.subtotal).sum()
}

/// Typed filter of the admin order list. Every present field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderFilter {
  pub status: Option<OrderStatus>,
  /// Inclusive, compared against the entry date.
  pub start_date: Option<NaiveDate>,
  /// Inclusive, compared against the entry date.
  pub end_date: Option<NaiveDate>,
  /// Substring of the order number or the customer name.
  pub search: Option<String>,
}

impl OrderFilter {
  /// Builds a filter from raw query values, treating blank values as absent.
  pub fn from_params(
    status: Option<&str>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    search: Option<&str>,
  ) -> Result<Self, AppError> {
    fn present(v: Option<&str>) -> Option<&str> {
      v.map(str::trim).filter(|v| !v.is_empty())
    }
    let parse_date = |name: &str, raw: &str| {
      NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid {} '{}': expected YYYY-MM-DD", name, raw)))
    };

    Ok(OrderFilter {
      status: present(status).map(str::parse::<OrderStatus>).transpose()?,
      start_date: present(start_date).map(|d| parse_date("start_date", d)).transpose()?,
      end_date: present(end_date).map(|d| parse_date("end_date", d)).transpose()?,
      search: present(search).map(str::to_string),
    })
  }

  pub fn matches(&self, order: &Order) -> bool {
    let entry_day = order.entry_date.date_naive();
    if self.status.is_some_and(|status| status != order.status) {
      return false;
    }
    if self.start_date.is_some_and(|start| entry_day < start) {
      return false;
    }
    if self.end_date.is_some_and(|end| entry_day > end) {
      return false;
    }
    match &self.search {
      Some(term) => {
        let term = term.to_lowercase();
        order.order_number.to_lowercase().contains(&term) || order.customer_name.to_lowercase().contains(&term)
      }
      None => true,
    }
  }
}
