// server/src/web/handlers/user_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::Account;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::response::ApiResponse;

#[derive(Deserialize, Debug, Default)]
pub struct UserListQuery {
  pub search: Option<String>,
}

async fn find_or_404(app_state: &AppState, id: i64) -> Result<Account, AppError> {
  app_state
    .stores
    .accounts
    .find_account(id)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[instrument(name = "handler::list_users", skip_all, fields(admin_id = admin.account.id))]
pub async fn list_users_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  query: web::Query<UserListQuery>,
) -> Result<HttpResponse, AppError> {
  let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
  let accounts = app_state.stores.accounts.list_accounts(search).await?;
  Ok(ApiResponse::list(accounts).ok())
}

#[instrument(name = "handler::get_user", skip_all, fields(admin_id = admin.account.id, user_id = %path.as_ref()))]
pub async fn get_user_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let account = find_or_404(&app_state, path.into_inner()).await?;
  Ok(ApiResponse::data(account).ok())
}

/// Customers can be removed; their orders stay without an owner. Admin accounts never can.
#[instrument(name = "handler::delete_user", skip_all, fields(admin_id = admin.account.id, user_id = %path.as_ref()))]
pub async fn delete_user_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let target = find_or_404(&app_state, path.into_inner()).await?;
  if target.is_admin() {
    warn!(target_id = target.id, "Refusing to delete an admin account.");
    return Err(AppError::Forbidden("Admin accounts cannot be deleted".to_string()));
  }

  // Orders survive the delete with their owner cleared.
  if !app_state.stores.accounts.delete_account(target.id).await? {
    return Err(AppError::NotFound("User not found".to_string()));
  }
  info!(target_id = target.id, "User deleted.");
  Ok(ApiResponse::message("User deleted").ok())
}
