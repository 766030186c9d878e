// server/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::models::{Account, ProfileUpdate};
use crate::pipelines::contexts::{SigninCtxData, SignupCtxData};
use crate::services::{auth_service, validation};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::run_pipeline;
use crate::web::response::ApiResponse;
use laundry_flow::ContextData;

// --- Request DTOs ---
#[derive(Deserialize, Debug)]
pub struct SignupRequestPayload {
  pub full_name: String,
  pub username: String,
  #[serde(default)]
  pub phone_number: Option<String>,
  pub password: String,
  pub confirm_password: String,
}

#[derive(Deserialize, Debug)]
pub struct LoginRequestPayload {
  pub username: String,
  pub password: String,
}

#[derive(Deserialize, Debug)]
pub struct ProfileRequestPayload {
  pub full_name: String,
  #[serde(default)]
  pub phone_number: Option<String>,
  #[serde(default)]
  pub new_password: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct LoginResponseData {
  pub token: String,
  pub user: Account,
}

// --- Handler Implementations ---

#[instrument(name = "handler::signup", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<SignupRequestPayload>,
) -> Result<HttpResponse, AppError> {
  // 1. Prepare the context; the pipeline fills in the account id
  let req = req_payload.into_inner();
  let signup_ctx = ContextData::new(SignupCtxData {
    app_state: app_state.get_ref().clone(),
    full_name: req.full_name,
    username: req.username,
    phone_number: req.phone_number,
    password: req.password,
    confirm_password: req.confirm_password,
    created_account_id: None,
  });

  // 2. Run the sign-up pipeline
  run_pipeline(&app_state, signup_ctx.clone(), "Registration").await?;

  // 3. No token is issued here; the client logs in next

  let account_id = signup_ctx.read().created_account_id.ok_or_else(|| {
    warn!("Signup pipeline completed but the account id was not set.");
    AppError::Internal("Registration completed without creating an account.".to_string())
  })?;
  info!(account_id, "Registration successful.");
  Ok(ApiResponse::message("Registration successful, please log in").created())
}

#[instrument(name = "handler::login", skip(app_state, req_payload), fields(username = %req_payload.username))]
pub async fn login_handler(
  app_state: web::Data<AppState>,
  req_payload: web::Json<LoginRequestPayload>,
) -> Result<HttpResponse, AppError> {
  // 1. Prepare the context
  let req = req_payload.into_inner();
  let signin_ctx = ContextData::new(SigninCtxData {
    app_state: app_state.get_ref().clone(),
    username: req.username,
    password: req.password,
    account: None,
    token: None,
  });

  // 2. Run the sign-in pipeline
  run_pipeline(&app_state, signin_ctx.clone(), "Login").await?;

  // 3. Respond with the token and the account it was issued for

  let (token, account) = signin_ctx.with(|c| (c.token.clone(), c.account.clone()));
  match (token, account) {
    (Some(token), Some(user)) => Ok(
      ApiResponse::data(LoginResponseData { token, user })
        .with_message("Login successful")
        .ok(),
    ),
    _ => {
      warn!("Login pipeline completed without a token or account.");
      Err(AppError::Internal("Login completed without a session token.".to_string()))
    }
  }
}

#[instrument(name = "handler::me", skip(auth_user), fields(account_id = auth_user.account.id))]
pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(ApiResponse::data(auth_user.account).ok())
}

#[instrument(name = "handler::update_profile", skip_all, fields(account_id = auth_user.account.id))]
pub async fn update_profile_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  req_payload: web::Json<ProfileRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let req = req_payload.into_inner();
  validation::profile(&req.full_name, req.new_password.as_deref())?;

  // An empty new password means "keep the current one"
  let password_hash = match req.new_password.as_deref().filter(|p| !p.is_empty()) {
    Some(new_password) => Some(auth_service::hash_password(new_password)?),
    None => None,
  };
  let update = ProfileUpdate {
    full_name: req.full_name.trim().to_string(),
    phone_number: req.phone_number.filter(|p| !p.trim().is_empty()),
    password_hash,
  };

  let accounts = &app_state.stores.accounts;
  accounts.update_profile(auth_user.account.id, &update).await?;
  let account = accounts
    .find_account(auth_user.account.id)
    .await?
    .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

  info!(password_changed = update.password_hash.is_some(), "Profile updated.");
  Ok(ApiResponse::data(account).with_message("Profile updated").ok())
}
