// server/src/pipelines/mod.rs

//! Multi-step workflows of the application, registered in the shared
//! `FlowRegistry` at startup.

use crate::errors::AppError;
use laundry_flow::FlowRegistry;

pub mod contexts;

pub mod chat_pipeline;
pub mod order_pipeline;
pub mod signin_pipeline;
pub mod signup_pipeline;

/// Registers every pipeline. Called once while building `AppState`.
pub fn register_all_pipelines(flows: &FlowRegistry<AppError>) {
  tracing::info!("Registering pipelines...");

  signup_pipeline::register_signup_pipeline(flows);
  signin_pipeline::register_signin_pipeline(flows);
  order_pipeline::register_create_order_pipeline(flows);
  chat_pipeline::register_chat_pipeline(flows);

  tracing::info!("All application pipelines registered.");
}
