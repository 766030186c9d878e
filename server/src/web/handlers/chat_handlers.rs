// server/src/web/handlers/chat_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::errors::AppError;
use crate::pipelines::contexts::ChatCtxData;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::handlers::run_pipeline;
use crate::web::response::ApiResponse;
use laundry_flow::ContextData;

#[derive(Deserialize, Debug)]
pub struct ChatRequestPayload {
  #[serde(default)]
  pub message: String,
}

#[derive(Serialize, Debug)]
pub struct ChatReply {
  pub message: String,
}

#[instrument(name = "handler::chat", skip_all, fields(admin_id = admin.account.id, message_len = req_payload.message.len()))]
pub async fn chat_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<ChatRequestPayload>,
) -> Result<HttpResponse, AppError> {
  // 1. Prepare the context with the raw message; validation happens in the pipeline
  let chat_ctx = ContextData::new(ChatCtxData::new(app_state.get_ref().clone(), req_payload.into_inner().message));

  // 2. Gather context and ask the assistant
  run_pipeline(&app_state, chat_ctx.clone(), "Chat").await?;

  // 3. Return the reply, which is the fallback text when the assistant said nothing

  let reply = chat_ctx.write().reply.take().ok_or_else(|| {
    warn!("Chat pipeline completed without a reply.");
    AppError::Internal("Chat completed without a reply.".to_string())
  })?;
  Ok(ApiResponse::data(ChatReply { message: reply }).ok())
}
