// server/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{CustomerStats, DashboardStats, OrderFilter, OrderItemInput, OrderStatus, TimeWindow};
use crate::pipelines::contexts::CreateOrderCtxData;
use crate::services::order_engine;
use crate::state::AppState;
use crate::web::extractors::{AdminUser, AuthenticatedUser};
use crate::web::handlers::run_pipeline;
use crate::web::response::ApiResponse;
use laundry_flow::ContextData;
use rust_decimal::Decimal;

#[derive(Deserialize, Debug, Default)]
pub struct OrderListQuery {
  pub status: Option<String>,
  pub start_date: Option<String>,
  pub end_date: Option<String>,
  pub search: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct CreateOrderPayload {
  pub customer_name: String,
  pub phone_number: String,
  #[serde(default)]
  pub items: Vec<OrderItemInput>,
  #[serde(default)]
  pub address: Option<String>,
  #[serde(default)]
  pub notes: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct StatusPayload {
  pub status: String,
}

#[instrument(name = "handler::list_orders", skip_all, fields(admin_id = admin.account.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<OrderListQuery>,
) -> Result<HttpResponse, AppError> {
  let filter = OrderFilter::from_params(
    query.status.as_deref(),
    query.start_date.as_deref(),
    query.end_date.as_deref(),
    query.search.as_deref(),
  )?;
  let orders = app_state.stores.orders.list_orders(&filter).await?;
  Ok(ApiResponse::list(orders).ok())
}

#[instrument(name = "handler::my_orders", skip_all, fields(account_id = auth_user.account.id))]
pub async fn my_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = app_state
    .stores
    .orders
    .list_orders_for_account(auth_user.account.id)
    .await?;
  Ok(ApiResponse::list(orders).ok())
}

/// Admins see any order; everybody else only their own, and a miss is a 404.
#[instrument(name = "handler::get_order", skip_all, fields(account_id = auth_user.account.id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let owner = (!auth_user.account.is_admin()).then_some(auth_user.account.id);
  let order = order_engine::load_order(app_state.stores.orders.as_ref(), path.into_inner(), owner).await?;
  Ok(ApiResponse::data(order).ok())
}

#[instrument(name = "handler::create_order", skip_all, fields(account_id = auth_user.account.id, items = req_payload.items.len()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  // 1. Prepare the context. Client prices are kept only for comparison;
  // the pipeline prices every line from the catalog.
  let req = req_payload.into_inner();
  let order_ctx = ContextData::new(CreateOrderCtxData {
    app_state: app_state.get_ref().clone(),
    account_id: auth_user.account.id,
    customer_name: req.customer_name,
    phone_number: req.phone_number,
    address: req.address,
    notes: req.notes,
    items: req.items,
    priced_lines: Vec::new(),
    total_price: Decimal::ZERO,
    order_number: None,
    order_id: None,
    created: None,
  });

  // 2. Run the order pipeline: validate, price, number, persist in one transaction
  run_pipeline(&app_state, order_ctx.clone(), "Order creation").await?;

  // 3. Respond with the order as stored, lines included

  let created = order_ctx.write().created.take().ok_or_else(|| {
    warn!("Order pipeline completed without loading the created order.");
    AppError::Internal("Order creation completed without a result.".to_string())
  })?;
  Ok(ApiResponse::data(created).with_message("Order created").created())
}

#[instrument(name = "handler::update_order_status", skip_all, fields(admin_id = admin.account.id, order_id = %path.as_ref(), status = %req_payload.status))]
pub async fn update_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
  // Any status may follow any other; concurrent updates are last-write-wins.
  let status = req_payload.status.parse::<OrderStatus>()?;
  let order = order_engine::update_status(app_state.stores.orders.as_ref(), path.into_inner(), status).await?;
  Ok(ApiResponse::data(order).with_message("Order status updated").ok())
}

#[instrument(name = "handler::cancel_order", skip_all, fields(account_id = auth_user.account.id, order_id = %path.as_ref()))]
pub async fn cancel_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let order =
    order_engine::cancel_for_customer(app_state.stores.orders.as_ref(), path.into_inner(), auth_user.account.id)
      .await?;
  Ok(ApiResponse::data(order).with_message("Order cancelled").ok())
}

#[instrument(name = "handler::order_stats", skip_all, fields(admin_id = admin.account.id))]
pub async fn stats_handler(app_state: web::Data<AppState>, admin: AdminUser) -> Result<HttpResponse, AppError> {
  let reports = &app_state.stores.reports;
  let now = Utc::now();
  // Windows are computed once so the three figures share the same `now`.
  let [today, this_week, this_month] = TimeWindow::ALL.map(|window| window.bounds(now));

  let (orders, accounts, today, this_week, this_month) = futures_util::try_join!(
    reports.order_stats(None),
    reports.account_counts(),
    reports.window_stats(today.0, today.1),
    reports.window_stats(this_week.0, this_week.1),
    reports.window_stats(this_month.0, this_month.1),
  )?;

  info!(total_orders = orders.total_orders, "Dashboard statistics computed.");
  Ok(
    ApiResponse::data(DashboardStats {
      orders,
      total_customers: accounts.customers,
      today,
      this_week,
      this_month,
    })
    .ok(),
  )
}

#[instrument(name = "handler::my_stats", skip_all, fields(account_id = auth_user.account.id))]
pub async fn my_stats_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let stats = app_state.stores.reports.order_stats(Some(auth_user.account.id)).await?;
  Ok(ApiResponse::data(CustomerStats::from(stats)).ok())
}
