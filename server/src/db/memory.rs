// server/src/db/memory.rs

//! In-process tables for demos and the test suite. Mirrors the constraints of
//! the MySQL schema: unique usernames and order numbers, line items that must
//! reference an existing service, and `ON DELETE SET NULL` for order owners.

use crate::db::{AccountStore, CatalogStore, OrderStore, OrderTransaction, ReportStore};
use crate::errors::{AppError, Result, DUPLICATE_DATA, REFERENCED_DATA, STILL_REFERENCED};
use crate::models::{
  Account, AccountCounts, NewAccount, NewOrder, NewOrderLine, Order, OrderFilter, OrderLine, OrderStats,
  OrderStatus, PopularService, ProfileUpdate, Role, Service, ServiceDraft, StatusCount, TopCustomer, WindowStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredLine {
  order_id: i64,
  line: NewOrderLine,
}

#[derive(Debug, Default)]
struct Tables {
  accounts: BTreeMap<i64, Account>,
  services: BTreeMap<i64, Service>,
  orders: BTreeMap<i64, Order>,
  lines: BTreeMap<i64, StoredLine>,
  last_account_id: i64,
  last_service_id: i64,
  last_order_id: i64,
  last_line_id: i64,
}

impl Tables {
  fn with_owner_name(&self, order: &Order) -> Order {
    let mut order = order.clone();
    order.user_fullname = order
      .user_id
      .and_then(|id| self.accounts.get(&id))
      .map(|account| account.full_name.clone());
    order
  }

  /// Newest first, matching `ORDER BY created_at DESC, id DESC`.
  fn orders_newest_first(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
    let mut orders: Vec<Order> = self
      .orders
      .values()
      .filter(|order| keep(*order))
      .map(|order| self.with_owner_name(order))
      .collect();
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    orders
  }

  fn stats<'a>(orders: impl Iterator<Item = &'a Order>) -> OrderStats {
    orders.fold(OrderStats::default(), |mut stats, order| {
      stats.total_orders += 1;
      match order.status {
        OrderStatus::Completed => {
          stats.completed_orders += 1;
          stats.total_revenue += order.total_price;
        }
        OrderStatus::Cancelled => stats.cancelled_orders += 1,
        _ => stats.active_orders += 1,
      }
      stats
    })
  }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
  haystack.to_lowercase().contains(needle_lower)
}

#[async_trait]
impl AccountStore for MemoryStore {
  async fn find_account(&self, id: i64) -> Result<Option<Account>> {
    Ok(self.tables.read().accounts.get(&id).cloned())
  }

  async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
    let tables = self.tables.read();
    Ok(tables.accounts.values().find(|a| a.username == username).cloned())
  }

  async fn username_exists(&self, username: &str) -> Result<bool> {
    Ok(self.tables.read().accounts.values().any(|a| a.username == username))
  }

  async fn insert_account(&self, account: &NewAccount) -> Result<i64> {
    let mut tables = self.tables.write();
    if tables.accounts.values().any(|a| a.username == account.username) {
      return Err(AppError::Conflict(DUPLICATE_DATA.to_string()));
    }
    tables.last_account_id += 1;
    let id = tables.last_account_id;
    tables.accounts.insert(
      id,
      Account {
        id,
        username: account.username.clone(),
        full_name: account.full_name.clone(),
        phone_number: account.phone_number.clone(),
        role: account.role,
        password_hash: account.password_hash.clone(),
        created_at: Utc::now(),
      },
    );
    Ok(id)
  }

  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<()> {
    let mut tables = self.tables.write();
    if let Some(account) = tables.accounts.get_mut(&id) {
      account.full_name = update.full_name.clone();
      account.phone_number = update.phone_number.clone();
      if let Some(hash) = &update.password_hash {
        account.password_hash = hash.clone();
      }
    }
    Ok(())
  }

  async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<Account>> {
    let tables = self.tables.read();
    let term = search.map(str::to_lowercase);
    let mut accounts: Vec<Account> = tables
      .accounts
      .values()
      .filter(|a| match &term {
        Some(term) => contains_ignore_case(&a.username, term) || contains_ignore_case(&a.full_name, term),
        None => true,
      })
      .cloned()
      .collect();
    accounts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(accounts)
  }

  async fn delete_account(&self, id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    if tables.accounts.remove(&id).is_none() {
      return Ok(false);
    }
    for order in tables.orders.values_mut().filter(|o| o.user_id == Some(id)) {
      order.user_id = None;
    }
    Ok(true)
  }
}

#[async_trait]
impl CatalogStore for MemoryStore {
  async fn list_active_services(&self) -> Result<Vec<Service>> {
    let tables = self.tables.read();
    let mut services: Vec<Service> = tables.services.values().filter(|s| s.is_active).cloned().collect();
    services.sort_by(|a, b| a.service_name.cmp(&b.service_name));
    Ok(services)
  }

  async fn list_services(&self) -> Result<Vec<Service>> {
    Ok(self.tables.read().services.values().cloned().collect())
  }

  async fn find_service(&self, id: i64) -> Result<Option<Service>> {
    Ok(self.tables.read().services.get(&id).cloned())
  }

  async fn insert_service(&self, draft: &ServiceDraft) -> Result<i64> {
    let mut tables = self.tables.write();
    tables.last_service_id += 1;
    let id = tables.last_service_id;
    tables.services.insert(
      id,
      Service {
        id,
        service_name: draft.service_name.clone(),
        unit: draft.unit,
        price: draft.price,
        description: draft.description.clone(),
        is_active: draft.is_active,
        created_at: Utc::now(),
      },
    );
    Ok(id)
  }

  async fn update_service(&self, id: i64, draft: &ServiceDraft) -> Result<()> {
    let mut tables = self.tables.write();
    if let Some(service) = tables.services.get_mut(&id) {
      service.service_name = draft.service_name.clone();
      service.unit = draft.unit;
      service.price = draft.price;
      service.description = draft.description.clone();
      service.is_active = draft.is_active;
    }
    Ok(())
  }

  async fn delete_service(&self, id: i64) -> Result<bool> {
    let mut tables = self.tables.write();
    if !tables.services.contains_key(&id) {
      return Ok(false);
    }
    if tables.lines.values().any(|stored| stored.line.service_id == id) {
      return Err(AppError::Conflict(STILL_REFERENCED.to_string()));
    }
    tables.services.remove(&id);
    Ok(true)
  }

  async fn count_services(&self) -> Result<i64> {
    Ok(self.tables.read().services.len() as i64)
  }
}

/// Rows staged until commit. Ids are reserved on insert, so a rolled back
/// transaction leaves a gap just like an auto-increment column does.
pub struct MemoryOrderTransaction {
  tables: Arc<RwLock<Tables>>,
  order: Option<(i64, NewOrder)>,
  lines: Vec<(i64, StoredLine)>,
}

#[async_trait]
impl OrderTransaction for MemoryOrderTransaction {
  async fn insert_order(&mut self, order: &NewOrder) -> Result<i64> {
    if self.order.is_some() {
      return Err(AppError::Internal("An order was already written in this transaction".to_string()));
    }
    let mut tables = self.tables.write();
    if tables.orders.values().any(|o| o.order_number == order.order_number) {
      return Err(AppError::Conflict(DUPLICATE_DATA.to_string()));
    }
    tables.last_order_id += 1;
    let id = tables.last_order_id;
    self.order = Some((id, order.clone()));
    Ok(id)
  }

  async fn insert_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<i64> {
    if !matches!(&self.order, Some((id, _)) if *id == order_id) {
      return Err(AppError::BadRequest(REFERENCED_DATA.to_string()));
    }
    let mut tables = self.tables.write();
    if !tables.services.contains_key(&line.service_id) {
      return Err(AppError::BadRequest(REFERENCED_DATA.to_string()));
    }
    tables.last_line_id += 1;
    let id = tables.last_line_id;
    self.lines.push((
      id,
      StoredLine {
        order_id,
        line: line.clone(),
      },
    ));
    Ok(id)
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    let MemoryOrderTransaction { tables, order, lines } = *self;
    let Some((order_id, order)) = order else {
      return Ok(());
    };
    let mut tables = tables.write();
    if tables.orders.values().any(|o| o.order_number == order.order_number) {
      return Err(AppError::Conflict(DUPLICATE_DATA.to_string()));
    }
    let user_id = order.user_id.filter(|id| tables.accounts.contains_key(id));
    tables.orders.insert(
      order_id,
      Order {
        id: order_id,
        order_number: order.order_number,
        user_id,
        customer_name: order.customer_name,
        phone_number: order.phone_number,
        address: order.address,
        status: order.status,
        total_price: order.total_price,
        notes: order.notes,
        entry_date: order.entry_date,
        completed_date: None,
        created_at: order.entry_date,
        user_fullname: None,
      },
    );
    tables.lines.extend(lines);
    debug!(order_id, "Staged order committed.");
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> Result<()> {
    debug!(staged_lines = self.lines.len(), "Staged order discarded.");
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MemoryStore {
  async fn begin(&self) -> Result<Box<dyn OrderTransaction>> {
    Ok(Box::new(MemoryOrderTransaction {
      tables: self.tables.clone(),
      order: None,
      lines: Vec::new(),
    }))
  }

  async fn find_order(&self, id: i64, owner: Option<i64>) -> Result<Option<Order>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .get(&id)
        .filter(|order| owner.is_none() || order.user_id == owner)
        .map(|order| tables.with_owner_name(order)),
    )
  }

  async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>> {
    let tables = self.tables.read();
    tables
      .lines
      .iter()
      .filter(|(_, stored)| stored.order_id == order_id)
      .map(|(id, stored)| {
        let service = tables
          .services
          .get(&stored.line.service_id)
          .ok_or_else(|| AppError::Internal(format!("Line {} references a missing service", id)))?;
        Ok(OrderLine {
          id: *id,
          order_id,
          service_id: service.id,
          service_name: service.service_name.clone(),
          unit: service.unit,
          quantity: stored.line.quantity,
          price: stored.line.price,
          subtotal: stored.line.subtotal,
        })
      })
      .collect()
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    Ok(tables.orders_newest_first(|order| filter.matches(order)))
  }

  async fn list_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    Ok(tables.orders_newest_first(|order| order.user_id == Some(account_id)))
  }

  async fn set_status(&self, id: i64, status: OrderStatus, completed_date: Option<DateTime<Utc>>) -> Result<()> {
    let mut tables = self.tables.write();
    if let Some(order) = tables.orders.get_mut(&id) {
      order.status = status;
      order.completed_date = completed_date;
    }
    Ok(())
  }
}

#[async_trait]
impl ReportStore for MemoryStore {
  async fn order_stats(&self, account_id: Option<i64>) -> Result<OrderStats> {
    let tables = self.tables.read();
    let orders = tables
      .orders
      .values()
      .filter(|order| account_id.is_none() || order.user_id == account_id);
    Ok(Tables::stats(orders))
  }

  async fn window_stats(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<WindowStats> {
    let tables = self.tables.read();
    let stats = Tables::stats(
      tables
        .orders
        .values()
        .filter(|order| order.created_at >= from && order.created_at < to),
    );
    Ok(WindowStats {
      orders: stats.total_orders,
      revenue: stats.total_revenue,
    })
  }

  async fn orders_by_status(&self) -> Result<Vec<StatusCount>> {
    let tables = self.tables.read();
    Ok(StatusCount::tally(tables.orders.values().map(|order| (order.status, 1))))
  }

  async fn top_customers(&self, limit: i64) -> Result<Vec<TopCustomer>> {
    let tables = self.tables.read();
    let mut grouped: HashMap<(String, String), (i64, Decimal)> = HashMap::new();
    for order in tables.orders.values().filter(|o| o.status == OrderStatus::Completed) {
      let entry = grouped
        .entry((order.customer_name.clone(), order.phone_number.clone()))
        .or_insert((0, Decimal::ZERO));
      entry.0 += 1;
      entry.1 += order.total_price;
    }
    let mut customers: Vec<TopCustomer> = grouped
      .into_iter()
      .map(|((customer_name, phone_number), (total_orders, total_spent))| TopCustomer {
        customer_name,
        phone_number,
        total_orders,
        total_spent,
      })
      .collect();
    customers.sort_by(|a, b| {
      b.total_orders
        .cmp(&a.total_orders)
        .then(b.total_spent.cmp(&a.total_spent))
        .then(a.customer_name.cmp(&b.customer_name))
    });
    customers.truncate(usize::try_from(limit).unwrap_or(0));
    Ok(customers)
  }

  async fn popular_services(&self, limit: i64) -> Result<Vec<PopularService>> {
    let tables = self.tables.read();
    let mut grouped: BTreeMap<i64, (i64, Decimal)> = BTreeMap::new();
    for stored in tables.lines.values() {
      let entry = grouped.entry(stored.line.service_id).or_insert((0, Decimal::ZERO));
      entry.0 += 1;
      entry.1 += stored.line.quantity;
    }
    let mut popular: Vec<PopularService> = grouped
      .into_iter()
      .filter_map(|(service_id, (times_ordered, total_quantity))| {
        tables.services.get(&service_id).map(|service| PopularService {
          service_name: service.service_name.clone(),
          unit: service.unit,
          price: service.price,
          times_ordered,
          total_quantity,
        })
      })
      .collect();
    popular.sort_by(|a, b| b.times_ordered.cmp(&a.times_ordered).then(a.service_name.cmp(&b.service_name)));
    popular.truncate(usize::try_from(limit).unwrap_or(0));
    Ok(popular)
  }

  async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    let take = usize::try_from(limit).unwrap_or(0);
    Ok(tables.orders_newest_first(|_| true).into_iter().take(take).collect())
  }

  async fn search_orders(&self, term: &str, limit: i64) -> Result<Vec<Order>> {
    let tables = self.tables.read();
    let term = term.to_lowercase();
    let take = usize::try_from(limit).unwrap_or(0);
    Ok(
      tables
        .orders_newest_first(|order| {
          contains_ignore_case(&order.customer_name, &term) || contains_ignore_case(&order.phone_number, &term)
        })
        .into_iter()
        .take(take)
        .collect(),
    )
  }

  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
    let tables = self.tables.read();
    Ok(
      tables
        .orders
        .values()
        .find(|order| order.order_number.eq_ignore_ascii_case(order_number))
        .map(|order| tables.with_owner_name(order)),
    )
  }

  async fn account_counts(&self) -> Result<AccountCounts> {
    let tables = self.tables.read();
    Ok(tables.accounts.values().fold(AccountCounts::default(), |mut counts, account| {
      match account.role {
        Role::Customer => counts.customers += 1,
        Role::Admin => counts.admins += 1,
      }
      counts
    }))
  }

  async fn active_service_count(&self) -> Result<i64> {
    Ok(self.tables.read().services.values().filter(|s| s.is_active).count() as i64)
  }
}
