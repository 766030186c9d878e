// server/src/web/handlers/mod.rs

pub mod auth_handlers;
pub mod chat_handlers;
pub mod order_handlers;
pub mod service_handlers;
pub mod user_handlers;

use crate::errors::AppError;
use crate::state::AppState;
use laundry_flow::{ContextData, PipelineResult};
use tracing::warn;

/// Runs the pipeline registered for `T`. None of the pipelines stop early on
/// success, so a stopped run is reported as an internal error.
pub(crate) async fn run_pipeline<T>(app_state: &AppState, ctx: ContextData<T>, action: &str) -> Result<(), AppError>
where
  T: Send + Sync + 'static,
{
  match app_state.flows.run(ctx).await? {
    PipelineResult::Completed => Ok(()),
    PipelineResult::Stopped => {
      warn!(action, "Pipeline was stopped by a handler.");
      Err(AppError::Internal(format!("{} was halted by an internal step.", action)))
    }
  }
}
