// server/src/db/mysql.rs

use crate::config::DatabaseConfig;
use crate::db::{contains_pattern, AccountStore, CatalogStore, OrderStore, OrderTransaction, ReportStore};
use crate::errors::{AppError, Result};
use crate::models::account::AccountRow;
use crate::models::order::{OrderLineRow, OrderRow};
use crate::models::service::ServiceRow;
use crate::models::{
  Account, AccountCounts, NewAccount, NewOrder, NewOrderLine, Order, OrderFilter, OrderLine, OrderStats,
  OrderStatus, PopularService, ProfileUpdate, Role, Service, ServiceDraft, StatusCount, TopCustomer, WindowStats,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions, MySqlQueryResult};
use sqlx::{FromRow, MySql, MySqlPool, QueryBuilder, Transaction};
use tracing::{debug, info, instrument};

const ACCOUNT_COLUMNS: &str = "SELECT id, username, full_name, phone_number, role, password_hash, created_at FROM users";

const SERVICE_COLUMNS: &str = "SELECT id, service_name, unit, price, description, is_active, created_at FROM services";

const ORDER_COLUMNS: &str = "SELECT o.id, o.order_number, o.user_id, o.customer_name, o.phone_number, o.address, \
   o.status, o.total_price, o.notes, o.entry_date, o.completed_date, o.created_at, u.full_name AS user_fullname \
   FROM orders o LEFT JOIN users u ON o.user_id = u.id";

const LINE_COLUMNS: &str = "SELECT od.id, od.order_id, od.service_id, s.service_name, s.unit, od.quantity, od.price, \
   od.subtotal FROM order_details od JOIN services s ON od.service_id = s.id";

#[instrument(name = "db::connect", skip(config), fields(host = %config.host, db = %config.name), err(Display))]
pub async fn connect(config: &DatabaseConfig) -> Result<MySqlPool> {
  let options = MySqlConnectOptions::new()
    .host(&config.host)
    .port(config.port)
    .username(&config.user)
    .password(config.password.expose())
    .database(&config.name);

  let pool = MySqlPoolOptions::new()
    .max_connections(config.pool_size)
    .connect_with(options)
    .await?;
  info!("Successfully connected to the database.");
  Ok(pool)
}

pub async fn migrate(pool: &MySqlPool) -> Result<()> {
  sqlx::migrate!("./migrations")
    .run(pool)
    .await
    .map_err(|e| AppError::Internal(format!("Database migration failed: {}", e)))?;
  info!("Database migrations applied.");
  Ok(())
}

fn inserted_id(result: MySqlQueryResult) -> Result<i64> {
  i64::try_from(result.last_insert_id())
    .map_err(|_| AppError::Internal("Inserted row id does not fit into i64".to_string()))
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
  T: TryFrom<R, Error = AppError>,
{
  rows.into_iter().map(T::try_from).collect()
}

/// Appends the filter's predicates to a query that already has a `WHERE` clause.
fn push_order_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &OrderFilter) {
  if let Some(status) = filter.status {
    qb.push(" AND o.status = ").push_bind(status.as_str());
  }
  if let Some(start) = filter.start_date {
    qb.push(" AND DATE(o.entry_date) >= ").push_bind(start);
  }
  if let Some(end) = filter.end_date {
    qb.push(" AND DATE(o.entry_date) <= ").push_bind(end);
  }
  if let Some(term) = &filter.search {
    let pattern = contains_pattern(term);
    qb.push(" AND (o.order_number LIKE ")
      .push_bind(pattern.clone())
      .push(" OR o.customer_name LIKE ")
      .push_bind(pattern)
      .push(")");
  }
}

#[derive(Debug, Clone)]
pub struct MySqlStore {
  pool: MySqlPool,
}

impl MySqlStore {
  pub fn new(pool: MySqlPool) -> Self {
    MySqlStore { pool }
  }

  pub fn pool(&self) -> &MySqlPool {
    &self.pool
  }

  async fn fetch_orders(&self, mut qb: QueryBuilder<'_, MySql>) -> Result<Vec<Order>> {
    let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    convert_all(rows)
  }
}

#[async_trait]
impl AccountStore for MySqlStore {
  async fn find_account(&self, id: i64) -> Result<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("{} WHERE id = ?", ACCOUNT_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Account::try_from).transpose()
  }

  async fn find_by_username(&self, username: &str) -> Result<Option<Account>> {
    let row: Option<AccountRow> = sqlx::query_as(&format!("{} WHERE username = ?", ACCOUNT_COLUMNS))
      .bind(username)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Account::try_from).transpose()
  }

  async fn username_exists(&self, username: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ?")
      .bind(username)
      .fetch_one(&self.pool)
      .await?;
    Ok(count > 0)
  }

  async fn insert_account(&self, account: &NewAccount) -> Result<i64> {
    let result = sqlx::query(
      "INSERT INTO users (username, full_name, phone_number, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&account.username)
    .bind(&account.full_name)
    .bind(&account.phone_number)
    .bind(&account.password_hash)
    .bind(account.role.as_str())
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    inserted_id(result)
  }

  async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<()> {
    sqlx::query(
      "UPDATE users SET full_name = ?, phone_number = ?, password_hash = COALESCE(?, password_hash) WHERE id = ?",
    )
    .bind(&update.full_name)
    .bind(&update.phone_number)
    .bind(&update.password_hash)
    .bind(id)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn list_accounts(&self, search: Option<&str>) -> Result<Vec<Account>> {
    let mut qb = QueryBuilder::<MySql>::new(ACCOUNT_COLUMNS);
    qb.push(" WHERE 1=1");
    if let Some(term) = search {
      let pattern = contains_pattern(term);
      qb.push(" AND (username LIKE ")
        .push_bind(pattern.clone())
        .push(" OR full_name LIKE ")
        .push_bind(pattern)
        .push(")");
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    let rows: Vec<AccountRow> = qb.build_query_as().fetch_all(&self.pool).await?;
    convert_all(rows)
  }

  async fn delete_account(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }
}

#[async_trait]
impl CatalogStore for MySqlStore {
  async fn list_active_services(&self) -> Result<Vec<Service>> {
    let rows: Vec<ServiceRow> = sqlx::query_as(&format!("{} WHERE is_active = TRUE ORDER BY service_name", SERVICE_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    convert_all(rows)
  }

  async fn list_services(&self) -> Result<Vec<Service>> {
    let rows: Vec<ServiceRow> = sqlx::query_as(&format!("{} ORDER BY id", SERVICE_COLUMNS))
      .fetch_all(&self.pool)
      .await?;
    convert_all(rows)
  }

  async fn find_service(&self, id: i64) -> Result<Option<Service>> {
    let row: Option<ServiceRow> = sqlx::query_as(&format!("{} WHERE id = ?", SERVICE_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    row.map(Service::try_from).transpose()
  }

  async fn insert_service(&self, draft: &ServiceDraft) -> Result<i64> {
    let result = sqlx::query(
      "INSERT INTO services (service_name, unit, price, description, is_active, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&draft.service_name)
    .bind(draft.unit.as_str())
    .bind(draft.price)
    .bind(&draft.description)
    .bind(draft.is_active)
    .bind(Utc::now())
    .execute(&self.pool)
    .await?;
    inserted_id(result)
  }

  async fn update_service(&self, id: i64, draft: &ServiceDraft) -> Result<()> {
    sqlx::query("UPDATE services SET service_name = ?, unit = ?, price = ?, description = ?, is_active = ? WHERE id = ?")
      .bind(&draft.service_name)
      .bind(draft.unit.as_str())
      .bind(draft.price)
      .bind(&draft.description)
      .bind(draft.is_active)
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn delete_service(&self, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM services WHERE id = ?").bind(id).execute(&self.pool).await?;
    Ok(result.rows_affected() > 0)
  }

  async fn count_services(&self) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services").fetch_one(&self.pool).await?;
    Ok(count)
  }
}

/// Order writes bound to one pooled connection until commit or rollback.
pub struct MySqlOrderTransaction {
  tx: Transaction<'static, MySql>,
}

#[async_trait]
impl OrderTransaction for MySqlOrderTransaction {
  async fn insert_order(&mut self, order: &NewOrder) -> Result<i64> {
    let result = sqlx::query(
      "INSERT INTO orders (order_number, user_id, customer_name, phone_number, address, status, total_price, notes, \
       entry_date, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&order.order_number)
    .bind(order.user_id)
    .bind(&order.customer_name)
    .bind(&order.phone_number)
    .bind(&order.address)
    .bind(order.status.as_str())
    .bind(order.total_price)
    .bind(&order.notes)
    .bind(order.entry_date)
    .bind(order.entry_date)
    .execute(&mut *self.tx)
    .await?;
    inserted_id(result)
  }

  async fn insert_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<i64> {
    let result =
      sqlx::query("INSERT INTO order_details (order_id, service_id, quantity, price, subtotal) VALUES (?, ?, ?, ?, ?)")
        .bind(order_id)
        .bind(line.service_id)
        .bind(line.quantity)
        .bind(line.price)
        .bind(line.subtotal)
        .execute(&mut *self.tx)
        .await?;
    inserted_id(result)
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    self.tx.commit().await?;
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> Result<()> {
    self.tx.rollback().await?;
    Ok(())
  }
}

#[async_trait]
impl OrderStore for MySqlStore {
  async fn begin(&self) -> Result<Box<dyn OrderTransaction>> {
    let tx = self.pool.begin().await?;
    debug!("Order transaction started.");
    Ok(Box::new(MySqlOrderTransaction { tx }))
  }

  async fn find_order(&self, id: i64, owner: Option<i64>) -> Result<Option<Order>> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" WHERE o.id = ").push_bind(id);
    if let Some(owner_id) = owner {
      qb.push(" AND o.user_id = ").push_bind(owner_id);
    }
    let row: Option<OrderRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
    row.map(Order::try_from).transpose()
  }

  async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>> {
    let rows: Vec<OrderLineRow> = sqlx::query_as(&format!("{} WHERE od.order_id = ? ORDER BY od.id", LINE_COLUMNS))
      .bind(order_id)
      .fetch_all(&self.pool)
      .await?;
    convert_all(rows)
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" WHERE 1=1");
    push_order_filter(&mut qb, filter);
    qb.push(" ORDER BY o.created_at DESC, o.id DESC");
    self.fetch_orders(qb).await
  }

  async fn list_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" WHERE o.user_id = ")
      .push_bind(account_id)
      .push(" ORDER BY o.created_at DESC, o.id DESC");
    self.fetch_orders(qb).await
  }

  async fn set_status(&self, id: i64, status: OrderStatus, completed_date: Option<DateTime<Utc>>) -> Result<()> {
    sqlx::query("UPDATE orders SET status = ?, completed_date = ? WHERE id = ?")
      .bind(status.as_str())
      .bind(completed_date)
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }
}

#[derive(FromRow)]
struct StatusCountRow {
  status: String,
  count: i64,
}

#[derive(FromRow)]
struct PopularServiceRow {
  service_name: String,
  unit: String,
  price: Decimal,
  times_ordered: i64,
  total_quantity: Decimal,
}

const ORDER_STATS_SELECT: &str = "SELECT COUNT(*) AS total_orders, \
   CAST(COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0) AS SIGNED) AS completed_orders, \
   CAST(COALESCE(SUM(CASE WHEN status NOT IN ('completed', 'cancelled') THEN 1 ELSE 0 END), 0) AS SIGNED) AS active_orders, \
   CAST(COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0) AS SIGNED) AS cancelled_orders, \
   COALESCE(SUM(CASE WHEN status = 'completed' THEN total_price ELSE 0 END), 0) AS total_revenue \
   FROM orders";

#[async_trait]
impl ReportStore for MySqlStore {
  async fn order_stats(&self, account_id: Option<i64>) -> Result<OrderStats> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_STATS_SELECT);
    if let Some(id) = account_id {
      qb.push(" WHERE user_id = ").push_bind(id);
    }
    let stats: OrderStats = qb.build_query_as().fetch_one(&self.pool).await?;
    Ok(stats)
  }

  async fn window_stats(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<WindowStats> {
    let stats: WindowStats = sqlx::query_as(
      "SELECT COUNT(*) AS orders, \
       COALESCE(SUM(CASE WHEN status = 'completed' THEN total_price ELSE 0 END), 0) AS revenue \
       FROM orders WHERE created_at >= ? AND created_at < ?",
    )
    .bind(from)
    .bind(to)
    .fetch_one(&self.pool)
    .await?;
    Ok(stats)
  }

  async fn orders_by_status(&self) -> Result<Vec<StatusCount>> {
    let rows: Vec<StatusCountRow> = sqlx::query_as("SELECT status, COUNT(*) AS count FROM orders GROUP BY status")
      .fetch_all(&self.pool)
      .await?;
    let counts = rows
      .into_iter()
      .map(|row| Ok((row.status.parse::<OrderStatus>()?, row.count)))
      .collect::<Result<Vec<_>>>()?;
    Ok(StatusCount::tally(counts))
  }

  async fn top_customers(&self, limit: i64) -> Result<Vec<TopCustomer>> {
    let rows: Vec<TopCustomer> = sqlx::query_as(
      "SELECT customer_name, phone_number, COUNT(*) AS total_orders, SUM(total_price) AS total_spent \
       FROM orders WHERE status = 'completed' \
       GROUP BY customer_name, phone_number \
       ORDER BY total_orders DESC, total_spent DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn popular_services(&self, limit: i64) -> Result<Vec<PopularService>> {
    let rows: Vec<PopularServiceRow> = sqlx::query_as(
      "SELECT s.service_name, s.unit, s.price, COUNT(od.id) AS times_ordered, SUM(od.quantity) AS total_quantity \
       FROM order_details od JOIN services s ON od.service_id = s.id \
       GROUP BY s.id, s.service_name, s.unit, s.price \
       ORDER BY times_ordered DESC, s.service_name LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    rows
      .into_iter()
      .map(|row| {
        Ok(PopularService {
          unit: row
            .unit
            .parse()
            .map_err(|_| AppError::Internal(format!("Unknown unit '{}' stored", row.unit)))?,
          service_name: row.service_name,
          price: row.price,
          times_ordered: row.times_ordered,
          total_quantity: row.total_quantity,
        })
      })
      .collect()
  }

  async fn recent_orders(&self, limit: i64) -> Result<Vec<Order>> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ").push_bind(limit);
    self.fetch_orders(qb).await
  }

  async fn search_orders(&self, term: &str, limit: i64) -> Result<Vec<Order>> {
    let pattern = contains_pattern(term);
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" WHERE o.customer_name LIKE ")
      .push_bind(pattern.clone())
      .push(" OR o.phone_number LIKE ")
      .push_bind(pattern)
      .push(" ORDER BY o.created_at DESC, o.id DESC LIMIT ")
      .push_bind(limit);
    self.fetch_orders(qb).await
  }

  async fn find_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
    let mut qb = QueryBuilder::<MySql>::new(ORDER_COLUMNS);
    qb.push(" WHERE o.order_number = ").push_bind(order_number);
    let row: Option<OrderRow> = qb.build_query_as().fetch_optional(&self.pool).await?;
    row.map(Order::try_from).transpose()
  }

  async fn account_counts(&self) -> Result<AccountCounts> {
    let counts: AccountCounts = sqlx::query_as(
      "SELECT CAST(COALESCE(SUM(CASE WHEN role = ? THEN 1 ELSE 0 END), 0) AS SIGNED) AS customers, \
       CAST(COALESCE(SUM(CASE WHEN role = ? THEN 1 ELSE 0 END), 0) AS SIGNED) AS admins FROM users",
    )
    .bind(Role::Customer.as_str())
    .bind(Role::Admin.as_str())
    .fetch_one(&self.pool)
    .await?;
    Ok(counts)
  }

  async fn active_service_count(&self) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM services WHERE is_active = TRUE")
      .fetch_one(&self.pool)
      .await?;
    Ok(count)
  }
}
