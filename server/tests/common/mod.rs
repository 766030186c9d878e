// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use mory_laundry::config::AppConfig;
use mory_laundry::db::{self, MemoryStore, Stores};
use mory_laundry::errors::{AppError, Result};
use mory_laundry::models::{Account, NewAccount, Role, Service};
use mory_laundry::services::auth_service;
use mory_laundry::services::completion_client::{CompletionClient, CompletionRequest};
use mory_laundry::state::AppState;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-pass-123";
pub const CUSTOMER_PASSWORD: &str = "secret1";

/// Builds an actix test service over the given `AppState`.
macro_rules! spawn_app {
  ($state:expr) => {
    actix_web::test::init_service(
      actix_web::App::new()
        .app_data(actix_web::web::Data::new($state.clone()))
        .configure(mory_laundry::web::configure_app_routes),
    )
    .await
  };
}

/// Sends a `TestRequest` and returns the status with the JSON body.
macro_rules! call {
  ($app:expr, $req:expr) => {{
    let resp = actix_web::test::call_service(&$app, $req.to_request()).await;
    let status = resp.status();
    let body: serde_json::Value = actix_web::test::read_body_json(resp).await;
    (status, body)
  }};
}

pub fn setup_tracing() {
  static INIT: OnceLock<()> = OnceLock::new();
  INIT.get_or_init(|| {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
      .with_test_writer()
      .try_init();
  });
}

pub fn test_config() -> AppConfig {
  config_for_env("development")
}

pub fn config_for_env(app_env: &str) -> AppConfig {
  let vars = [
    ("APP_ENV", app_env),
    ("JWT_SECRET", "test-secret"),
    ("STORAGE_BACKEND", "memory"),
    ("SEED_DB", "true"),
    ("ADMIN_USERNAME", ADMIN_USERNAME),
    ("ADMIN_PASSWORD", ADMIN_PASSWORD),
  ];
  AppConfig::from_lookup(|key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string()))
    .expect("test configuration is valid")
}

/// How the stub assistant answers.
#[derive(Debug, Clone)]
pub enum StubOutcome {
  Reply(String),
  Empty,
  RateLimited,
}

/// Records every completion request and answers with a fixed outcome.
pub struct StubAssistant {
  outcome: StubOutcome,
  pub requests: Mutex<Vec<CompletionRequest>>,
}

impl StubAssistant {
  pub fn new(outcome: StubOutcome) -> Arc<Self> {
    Arc::new(StubAssistant {
      outcome,
      requests: Mutex::new(Vec::new()),
    })
  }

  /// The user-role message of the last request.
  pub fn last_prompt(&self) -> Option<String> {
    self
      .requests
      .lock()
      .last()
      .and_then(|request| request.messages.iter().find(|m| m.role == "user"))
      .map(|message| message.content.clone())
  }
}

#[async_trait]
impl CompletionClient for StubAssistant {
  async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>> {
    self.requests.lock().push(request.clone());
    match &self.outcome {
      StubOutcome::Reply(text) => Ok(Some(text.clone())),
      StubOutcome::Empty => Ok(None),
      StubOutcome::RateLimited => Err(AppError::TooManyRequests(
        "Too many requests. Please try again in a few seconds.".to_string(),
      )),
    }
  }
}

/// Seeded in-memory state: the admin account and the default catalog.
pub async fn seeded_state_with(stores: Stores, assistant: Option<Arc<dyn CompletionClient>>) -> AppState {
  seeded_state_for(test_config(), stores, assistant).await
}

pub async fn seeded_state_for(
  config: AppConfig,
  stores: Stores,
  assistant: Option<Arc<dyn CompletionClient>>,
) -> AppState {
  setup_tracing();
  db::seed::seed(&stores, &config).await.expect("seeding succeeds");
  AppState::new(config, stores, assistant)
}

pub async fn seeded_state(assistant: Option<Arc<dyn CompletionClient>>) -> AppState {
  seeded_state_with(Stores::from_backend(Arc::new(MemoryStore::new())), assistant).await
}

pub async fn admin_token(state: &AppState) -> String {
  let admin = state
    .stores
    .accounts
    .find_by_username(ADMIN_USERNAME)
    .await
    .unwrap()
    .expect("admin is seeded");
  state.tokens.issue(&admin).unwrap()
}

/// Creates a customer directly in the store and returns it with a token.
pub async fn customer(state: &AppState, username: &str, full_name: &str) -> (Account, String) {
  let id = state
    .stores
    .accounts
    .insert_account(&NewAccount {
      username: username.to_string(),
      full_name: full_name.to_string(),
      phone_number: None,
      password_hash: auth_service::hash_password(CUSTOMER_PASSWORD).unwrap(),
      role: Role::Customer,
    })
    .await
    .unwrap();
  let account = state.stores.accounts.find_account(id).await.unwrap().unwrap();
  let token = state.tokens.issue(&account).unwrap();
  (account, token)
}

pub async fn service_named(state: &AppState, name: &str) -> Service {
  state
    .stores
    .catalog
    .list_services()
    .await
    .unwrap()
    .into_iter()
    .find(|service| service.service_name == name)
    .unwrap_or_else(|| panic!("service '{}' is seeded", name))
}

pub fn bearer(token: &str) -> (&'static str, String) {
  ("Authorization", format!("Bearer {}", token))
}

/// Reads a money or quantity field whether it was serialized as a string or a number.
pub fn decimal(value: &Value) -> Decimal {
  match value {
    Value::String(s) => s.parse().unwrap(),
    Value::Number(n) => n.to_string().parse().unwrap(),
    other => panic!("not a decimal: {}", other),
  }
}
