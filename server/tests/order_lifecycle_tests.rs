// tests/order_lifecycle_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::*;
use mory_laundry::db::{MemoryStore, OrderStore, OrderTransaction, Stores};
use mory_laundry::errors::{AppError, Result};
use mory_laundry::models::{NewOrder, NewOrderLine, Order, OrderFilter, OrderLine, OrderStatus};
use mory_laundry::services::order_engine;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Delegates to the memory store but fails the second line written in a transaction,
/// so a three-line order breaks with one line written and one still pending.
struct FailingOrderStore {
  inner: MemoryStore,
}

struct FailingTransaction {
  inner: Box<dyn OrderTransaction>,
  lines_written: usize,
}

#[async_trait]
impl OrderTransaction for FailingTransaction {
  async fn insert_order(&mut self, order: &NewOrder) -> Result<i64> {
    self.inner.insert_order(order).await
  }

  async fn insert_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<i64> {
    self.lines_written += 1;
    if self.lines_written == 2 {
      return Err(AppError::Internal("injected line failure".to_string()));
    }
    self.inner.insert_line(order_id, line).await
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    self.inner.commit().await
  }

  async fn rollback(self: Box<Self>) -> Result<()> {
    self.inner.rollback().await
  }
}

#[async_trait]
impl OrderStore for FailingOrderStore {
  async fn begin(&self) -> Result<Box<dyn OrderTransaction>> {
    Ok(Box::new(FailingTransaction {
      inner: self.inner.begin().await?,
      lines_written: 0,
    }))
  }

  async fn find_order(&self, id: i64, owner: Option<i64>) -> Result<Option<Order>> {
    self.inner.find_order(id, owner).await
  }

  async fn order_lines(&self, order_id: i64) -> Result<Vec<OrderLine>> {
    self.inner.order_lines(order_id).await
  }

  async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
    self.inner.list_orders(filter).await
  }

  async fn list_orders_for_account(&self, account_id: i64) -> Result<Vec<Order>> {
    self.inner.list_orders_for_account(account_id).await
  }

  async fn set_status(&self, id: i64, status: OrderStatus, completed_date: Option<DateTime<Utc>>) -> Result<()> {
    self.inner.set_status(id, status, completed_date).await
  }
}

#[actix_web::test]
async fn test_failed_line_write_leaves_no_order_behind() {
  let memory = MemoryStore::new();
  let shared = Arc::new(memory.clone());
  let stores = Stores {
    accounts: shared.clone(),
    catalog: shared.clone(),
    orders: Arc::new(FailingOrderStore { inner: memory }),
    reports: shared,
  };
  let state = seeded_state_with(stores, None).await;
  let app = spawn_app!(state);
  let (account, token) = customer(&state, "olga", "Olga Petrov").await;
  let first = service_named(&state, "Wash & Fold").await;
  let second = service_named(&state, "Iron Only").await;
  let third = service_named(&state, "Shoes").await;

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({
        "customer_name": "Olga Petrov",
        "phone_number": "0888888888",
        "items": [
          {"service_id": first.id, "quantity": 1},
          {"service_id": second.id, "quantity": 1},
          {"service_id": third.id, "quantity": 1}
        ]
      }))
  );
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

  let orders = &state.stores.orders;
  assert!(orders.list_orders(&OrderFilter::default()).await.unwrap().is_empty());
  assert!(orders.list_orders_for_account(account.id).await.unwrap().is_empty());
  assert_eq!(state.stores.reports.order_stats(None).await.unwrap().total_orders, 0);

  // A single-line order still goes through.
  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({
        "customer_name": "Olga Petrov",
        "phone_number": "0888888888",
        "items": [{"service_id": first.id, "quantity": 1}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  assert_eq!(body["data"]["details"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_leaving_completed_clears_the_completion_date() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let (_, token) = customer(&state, "pete", "Pete Sampras").await;
  let service = service_named(&state, "Wash & Iron").await;

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({
        "customer_name": "Pete Sampras",
        "phone_number": "0899999999",
        "items": [{"service_id": service.id, "quantity": 2}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED);
  let id = body["data"]["id"].as_i64().unwrap();
  let orders = state.stores.orders.as_ref();

  let completed = order_engine::update_status(orders, id, OrderStatus::Completed).await.unwrap();
  assert!(completed.order.completed_date.is_some());

  let reopened = order_engine::update_status(orders, id, OrderStatus::Washing).await.unwrap();
  assert_eq!(reopened.order.status, OrderStatus::Washing);
  assert!(reopened.order.completed_date.is_none());

  let cancelled = order_engine::update_status(orders, id, OrderStatus::Cancelled).await.unwrap();
  assert!(cancelled.order.completed_date.is_none());
  assert_eq!(state.stores.reports.order_stats(None).await.unwrap().cancelled_orders, 1);
}

#[actix_web::test]
async fn test_order_numbers_are_unique_and_totals_match_lines() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let (_, token) = customer(&state, "quinn", "Quinn Fabray").await;
  let shoes = service_named(&state, "Shoes").await;
  let carpet = service_named(&state, "Carpet").await;

  let mut numbers = HashSet::new();
  for quantity in 1..=5 {
    let (status, body) = call!(
      app,
      TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&token))
        .set_json(json!({
          "customer_name": "Quinn Fabray",
          "phone_number": "0810101010",
          "items": [
            {"service_id": shoes.id, "quantity": quantity},
            {"service_id": carpet.id, "quantity": "2.5"}
          ]
        }))
    );
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let data = &body["data"];
    assert!(numbers.insert(data["order_number"].as_str().unwrap().to_string()));

    let line_sum: rust_decimal::Decimal = data["details"]
      .as_array()
      .unwrap()
      .iter()
      .map(|line| decimal(&line["subtotal"]))
      .sum();
    assert_eq!(decimal(&data["total_price"]), line_sum);
  }
  assert_eq!(numbers.len(), 5);
}

#[actix_web::test]
async fn test_fractional_quantity_keeps_the_exact_subtotal() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let admin = admin_token(&state).await;
  let (_, token) = customer(&state, "rhea", "Rhea Silva").await;

  let (status, body) = call!(
    app,
    TestRequest::post().uri("/api/services").insert_header(bearer(&admin)).set_json(json!({
      "service_name": "Odd Weight",
      "unit": "kg",
      "price": "7333.33"
    }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  let service_id = body["data"]["id"].as_i64().unwrap();

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({
        "customer_name": "Rhea Silva",
        "phone_number": "0811223344",
        "items": [{"service_id": service_id, "quantity": "2.5"}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  let line = &body["data"]["details"][0];
  let quantity = decimal(&line["quantity"]);
  let price = decimal(&line["price"]);
  assert_eq!(decimal(&line["subtotal"]), quantity * price);
  assert_eq!(decimal(&line["subtotal"]), "18333.325".parse::<rust_decimal::Decimal>().unwrap());
  assert_eq!(decimal(&body["data"]["total_price"]), "18333.325".parse::<rust_decimal::Decimal>().unwrap());
}
