// server/src/pipelines/contexts.rs

//! Data carried through each pipeline. Handlers receive these wrapped in
//! `laundry_flow::ContextData`.

use crate::models::{Account, NewOrderLine, OrderItemInput, OrderWithLines, Service};
use crate::services::chat_context::{ChatSnapshot, CustomerSearch, OrderLookup};
use crate::state::AppState;
use rust_decimal::Decimal;

#[derive(Clone)]
pub struct SignupCtxData {
  pub app_state: AppState,
  pub full_name: String,
  pub username: String,
  pub phone_number: Option<String>,
  pub password: String,
  pub confirm_password: String,
  pub created_account_id: Option<i64>,
}

#[derive(Clone)]
pub struct SigninCtxData {
  pub app_state: AppState,
  pub username: String,
  pub password: String,
  pub account: Option<Account>,
  pub token: Option<String>,
}

#[derive(Clone)]
pub struct CreateOrderCtxData {
  pub app_state: AppState,
  pub account_id: i64,
  pub customer_name: String,
  pub phone_number: String,
  pub address: Option<String>,
  pub notes: Option<String>,
  pub items: Vec<OrderItemInput>,
  // Filled in by the pricing step
  pub priced_lines: Vec<NewOrderLine>,
  pub total_price: Decimal,
  pub order_number: Option<String>,
  pub order_id: Option<i64>,
  pub created: Option<OrderWithLines>,
}

#[derive(Clone)]
pub struct ChatCtxData {
  pub app_state: AppState,
  pub message: String,
  pub snapshot: Option<ChatSnapshot>,
  pub order_lookup: Option<OrderLookup>,
  pub customer_search: Option<CustomerSearch>,
  pub service_detail: Option<Service>,
  pub reply: Option<String>,
}

impl ChatCtxData {
  pub fn new(app_state: AppState, message: String) -> Self {
    ChatCtxData {
      app_state,
      message,
      snapshot: None,
      order_lookup: None,
      customer_search: None,
      service_detail: None,
      reply: None,
    }
  }
}
