// server/src/web/extractors.rs

//! Request guards: a bearer token resolved to a live account, and the admin check on top.

use crate::errors::AppError;
use crate::models::Account;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;

/// Any signed-in account.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub account: Account,
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
  req
    .headers()
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .and_then(|value| value.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|token| !token.is_empty())
    .map(str::to_string)
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let app_state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);

    Box::pin(async move {
      let app_state = app_state.ok_or_else(|| AppError::Internal("Application state is not configured".to_string()))?;
      let token = token.ok_or_else(|| {
        warn!("Request without a bearer token.");
        AppError::Unauthorized("Access denied, no token provided".to_string())
      })?;

      let claims = app_state.tokens.verify(&token)?;
      let account_id = claims.account_id()?;
      let account = app_state
        .stores
        .accounts
        .find_account(account_id)
        .await?
        .ok_or_else(|| {
          warn!(account_id, "Token refers to an account that no longer exists.");
          AppError::Unauthorized("Account not found".to_string())
        })?;
      Ok(AuthenticatedUser { account })
    })
  }
}

/// A signed-in account with the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser {
  pub account: Account,
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
    let authenticated = AuthenticatedUser::from_request(req, payload);
    Box::pin(async move {
      let AuthenticatedUser { account } = authenticated.await?;
      if !account.is_admin() {
        warn!(account_id = account.id, "Non-admin account tried an admin route.");
        return Err(AppError::Forbidden("Access denied, admin only".to_string()));
      }
      Ok(AdminUser { account })
    })
  }
}
