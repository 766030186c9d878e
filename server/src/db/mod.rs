// server/src/db/mod.rs

//! Storage seams. Handlers and pipelines only see these traits; the backend
//! (MySQL or in-memory) is picked once at startup and injected via `Stores`.

pub mod memory;
pub mod mysql;
pub mod seed;

use crate::errors::Result;
use crate::models::{
  Account, AccountCounts, NewAccount, NewOrder, NewOrderLine, Order, OrderFilter, OrderLine, OrderStats,
  OrderStatus, PopularService, ProfileUpdate, Service, ServiceDraft, StatusCount, TopCustomer, WindowStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[async_trait]
pub trait AccountStore: Send + Sync {
  async fn find_account(&self, id: i64) -> Result<Option<Account>>;

  async fn find_by_username(&self, username: &str) -> Result<Option<Account>>;

  async fn username_exists(&self, username: &str) -> Result<bool>;

  /// Fails with `Conflict` when the username is taken.
  async fn insert_account(&self, account: &NewAccount) -> Result<i64>;

  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<()>;

  /// Newest first; `search` matches username or full name.
  async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<Account>>;

  /// Returns whether a row was removed.
  async fn delete_account(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
  /// Active entries ordered by name.
  async fn list_active_services(&self) -> Result<Vec<Service>>;

  /// Every entry ordered by id.
  async fn list_services(&self) -> Result<Vec<Service>>;

  async fn find_service(&self, id: i64) -> Result<Option<Service>>;

  async fn insert_service(&self, draft: &ServiceDraft) -> Result<i64>;

  async fn update_service(&self, id: i64, draft: &ServiceDraft) -> Result<()>;

  /// Hard delete. Returns whether a row was removed.
  async fn delete_service(&self, id: i64) -> Result<bool>;

  async fn count_services(&self) -> Result<i64>;
}

/// An open unit of work for writing one order and its lines.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// everything written through it.
#[async_trait]
pub trait OrderTransaction: Send {
  async fn insert_order(&mut self, order: &NewOrder) -> Result<i64>;

  async fn insert_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<i64>;

  async fn commit(self: Box<Self>) -> Result<()>;

  async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
  async fn begin(&self) -> Result<Box<dyn OrderTransaction>>;

  /// With `owner` set the lookup only matches orders of that account.
  async fn find_order(&self, id: i64, owner: Option<i64>) -> Result<Option<Order>>;

  async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>>;

  /// Newest first.
  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;

  /// Newest first.
  async fn list_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>>;

  async fn set_status(&self, id: i64, status: OrderStatus, completed_date: Option<DateTime<Utc>>) -> Result<()>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
  /// Counts and completed revenue, for one account or for everybody.
  async fn order_stats(&self, account_id: Option<i64>) -> Result<OrderStats>;

  /// Orders created in `[from, to)` and the completed revenue among them.
  async fn window_stats(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<WindowStats>;

  async fn orders_by_status(&self) -> Result<Vec<StatusCount>>;

  /// Completed orders grouped by customer name and phone.
  async fn top_customers(&self, limit: i64) -> Result<Vec<TopCustomer>>;

  async fn popular_services(&self, limit: i64) -> Result<Vec<PopularService>>;

  async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>>;

  /// Substring match on customer name or phone number, newest first.
  async fn search_orders(&self, term: &str, limit: i64) -> Result<Vec<Order>>;

  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;

  async fn account_counts(&self) -> Result<AccountCounts>;

  async fn active_service_count(&self) -> Result<i64>;
}

/// The storage handles shared through `AppState`.
#[derive(Clone)]
pub struct Stores {
  pub accounts: Arc<dyn AccountStore>,
  pub catalog: Arc<dyn CatalogStore>,
  pub orders: Arc<dyn OrderStore>,
  pub reports: Arc<dyn ReportStore>,
}

impl Stores {
  /// Uses one backend for every store.
  pub fn from_backend<S>(backend: Arc<S>) -> Self
  where
    S: AccountStore + CatalogStore + OrderStore + ReportStore + 'static,
  {
    Stores {
      accounts: backend.clone(),
      catalog: backend.clone(),
      orders: backend.clone(),
      reports: backend,
    }
  }
}

/// `LIKE` pattern matching `term` anywhere, with wildcards in `term` escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
  let mut pattern = String::with_capacity(term.len() + 2);
  pattern.push('%');
  for c in term.chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}
