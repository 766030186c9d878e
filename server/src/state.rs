// server/src/state.rs

use crate::config::AppConfig;
use crate::db::Stores;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::completion_client::CompletionClient;
use crate::services::order_numbers::OrderNumberGenerator;
use crate::services::token_service::TokenKeys;
use laundry_flow::FlowRegistry;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
  pub stores: Stores,
  pub flows: Arc<FlowRegistry<AppError>>,
  pub config: Arc<AppConfig>, // Share loaded config
  pub tokens: TokenKeys,
  pub order_numbers: Arc<OrderNumberGenerator>,
  /// `None` when no completion API key is configured.
  pub assistant: Option<Arc<dyn CompletionClient>>,
}

impl AppState {
  /// Builds the shared state and registers every pipeline.
  pub fn new(config: AppConfig, stores: Stores, assistant: Option<Arc<dyn CompletionClient>>) -> Self {
    let flows = Arc::new(FlowRegistry::<AppError>::new());
    pipelines::register_all_pipelines(&flows);
    AppState {
      stores,
      tokens: TokenKeys::from_secret(config.jwt_secret.expose(), config.jwt_ttl_hours),
      flows,
      config: Arc::new(config),
      order_numbers: Arc::new(OrderNumberGenerator::new()),
      assistant,
    }
  }
}
