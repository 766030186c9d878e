// server/src/models/report.rs

//! Read-side aggregates behind the dashboards and the chat assistant.

use crate::models::order::OrderStatus;
use crate::models::service::ServiceUnit;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

/// Calendar windows used by the statistics, all evaluated in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeWindow {
  Today,
  /// ISO week, starting Monday.
  ThisWeek,
  ThisMonth,
}

impl TimeWindow {
  pub const ALL: [TimeWindow; 3] = [TimeWindow::Today, TimeWindow::ThisWeek, TimeWindow::ThisMonth];

  pub fn label(&self) -> &'static str {
    match self {
      TimeWindow::Today => "today",
      TimeWindow::ThisWeek => "this week",
      TimeWindow::ThisMonth => "this month",
    }
  }

  /// Half-open `[start, end)` range of the window containing `now`.
  pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let (first_day, next_first_day) = match self {
      TimeWindow::Today => (today, today + Duration::days(1)),
      TimeWindow::ThisWeek => {
        let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        (monday, monday + Duration::days(7))
      }
      TimeWindow::ThisMonth => {
        let first = today - Duration::days(i64::from(today.day0()));
        (first, first + Months::new(1))
      }
    };
    (midnight(first_day), midnight(next_first_day))
  }
}

fn midnight(day: NaiveDate) -> DateTime<Utc> {
  day.and_time(NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct OrderStats {
  pub total_orders: i64,
  pub completed_orders: i64,
  /// Neither completed nor cancelled.
  pub active_orders: i64,
  pub cancelled_orders: i64,
  /// Sum of completed orders only.
  pub total_revenue: Decimal,
}

/// Orders entered in a window and the revenue of the completed ones among them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct WindowStats {
  pub orders: i64,
  pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
  #[serde(flatten)]
  pub orders: OrderStats,
  pub total_customers: i64,
  pub today: WindowStats,
  pub this_week: WindowStats,
  pub this_month: WindowStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CustomerStats {
  pub total_orders: i64,
  pub active_orders: i64,
  pub completed_orders: i64,
  pub cancelled_orders: i64,
}

impl From<OrderStats> for CustomerStats {
  fn from(stats: OrderStats) -> Self {
    CustomerStats {
      total_orders: stats.total_orders,
      active_orders: stats.active_orders,
      completed_orders: stats.completed_orders,
      cancelled_orders: stats.cancelled_orders,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
  pub status: OrderStatus,
  pub count: i64,
}

impl StatusCount {
  /// Expands sparse `(status, count)` pairs to every status in display order.
  pub fn tally(counts: impl IntoIterator<Item = (OrderStatus, i64)>) -> Vec<StatusCount> {
    let mut all: Vec<StatusCount> = OrderStatus::ALL
      .iter()
      .map(|status| StatusCount {
        status: *status,
        count: 0,
      })
      .collect();
    for (status, count) in counts {
      if let Some(slot) = all.iter_mut().find(|slot| slot.status == status) {
        slot.count += count;
      }
    }
    all
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct TopCustomer {
  pub customer_name: String,
  pub phone_number: String,
  pub total_orders: i64,
  pub total_spent: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularService {
  pub service_name: String,
  pub unit: ServiceUnit,
  pub price: Decimal,
  pub times_ordered: i64,
  pub total_quantity: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, FromRow)]
pub struct AccountCounts {
  pub customers: i64,
  pub admins: i64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
  }

  #[test]
  fn today_covers_the_current_utc_day() {
    let (start, end) = TimeWindow::Today.bounds(at(2025, 3, 14, 17));
    assert_eq!(start, at(2025, 3, 14, 0));
    assert_eq!(end, at(2025, 3, 15, 0));
  }

  #[test]
  fn week_starts_on_monday() {
    // 2025-03-14 is a Friday
    let (start, end) = TimeWindow::ThisWeek.bounds(at(2025, 3, 14, 9));
    assert_eq!(start, at(2025, 3, 10, 0));
    assert_eq!(end, at(2025, 3, 17, 0));

    // a Monday is its own week start
    let (start, _) = TimeWindow::ThisWeek.bounds(at(2025, 3, 10, 0));
    assert_eq!(start, at(2025, 3, 10, 0));

    // Sunday still belongs to the week that began six days earlier
    let (start, _) = TimeWindow::ThisWeek.bounds(at(2025, 3, 16, 23));
    assert_eq!(start, at(2025, 3, 10, 0));
  }

  #[test]
  fn month_rolls_over_the_year() {
    let (start, end) = TimeWindow::ThisMonth.bounds(at(2024, 12, 31, 23));
    assert_eq!(start, at(2024, 12, 1, 0));
    assert_eq!(end, at(2025, 1, 1, 0));

    let (start, end) = TimeWindow::ThisMonth.bounds(at(2024, 2, 29, 12));
    assert_eq!(start, at(2024, 2, 1, 0));
    assert_eq!(end, at(2024, 3, 1, 0));
  }

  #[test]
  fn tally_fills_missing_statuses_in_order() {
    let tallied = StatusCount::tally(vec![(OrderStatus::Completed, 4), (OrderStatus::Queued, 2)]);
    assert_eq!(tallied.len(), 7);
    assert_eq!(tallied[0], StatusCount { status: OrderStatus::Queued, count: 2 });
    assert_eq!(tallied[5], StatusCount { status: OrderStatus::Completed, count: 4 });
    assert_eq!(tallied[6].count, 0);
  }
}
