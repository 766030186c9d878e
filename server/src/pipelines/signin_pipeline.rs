// server/src/pipelines/signin_pipeline.rs

use crate::errors::AppError;
use crate::pipelines::contexts::SigninCtxData;
use crate::services::{auth_service, validation};
use laundry_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Same answer for an unknown username and a wrong password.
pub const WRONG_CREDENTIALS: &str = "Wrong username or password";

fn wrong_credentials() -> AppError {
  AppError::Unauthorized(WRONG_CREDENTIALS.to_string())
}

/// Registers the sign-in pipeline.
pub fn register_signin_pipeline(flows: &FlowRegistry<AppError>) {
  let mut signin_p = Pipeline::<SigninCtxData, AppError>::new(&[
    ("validate_signin_input", false, None),
    ("find_account", false, None),
    ("verify_password", false, None),
    ("issue_token", false, None),
  ]);

  // Step 1: Validate input
  signin_p.on_root("validate_signin_input", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      ctx_data.with(|c| validation::login(&c.username, &c.password))?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: Fetch the account by username.
  // Unknown usernames get the same error as a wrong password so usernames cannot be enumerated.
  signin_p.on_root("find_account", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (username, accounts) = ctx_data.with(|c| (c.username.clone(), c.app_state.stores.accounts.clone()));

      event!(Level::DEBUG, %username, "Fetching account for sign-in.");
      match accounts.find_by_username(&username).await? {
        Some(account) => {
          event!(Level::DEBUG, account_id = account.id, "Account found for sign-in.");
          ctx_data.write().account = Some(account);
          Ok::<_, AppError>(PipelineControl::Continue)
        }
        None => {
          warn!(%username, "Sign-in attempt for unknown username.");
          Err(wrong_credentials())
        }
      }
    })
  });

  // Step 3: Verify password against the stored Argon2 hash
  signin_p.on_root("verify_password", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (password_hash, password) = ctx_data.with(|c| {
        (
          c.account.as_ref().map(|a| a.password_hash.clone()),
          c.password.clone(),
        )
      });
      let password_hash = password_hash
        .ok_or_else(|| AppError::Internal("Account missing before password verification".to_string()))?;

      if !auth_service::verify_password(&password_hash, &password)? {
        warn!("Sign-in attempt with a wrong password.");
        return Err(wrong_credentials());
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 4: Issue the session token
  signin_p.on_root("issue_token", |ctx_data: ContextData<SigninCtxData>| {
    Box::pin(async move {
      let (account, tokens) = ctx_data.with(|c| (c.account.clone(), c.app_state.tokens.clone()));
      let account = account.ok_or_else(|| AppError::Internal("Account missing before token issuance".to_string()))?;

      let token = tokens.issue(&account)?;
      ctx_data.write().token = Some(token);
      info!(account_id = account.id, role = %account.role, "Signed in.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signin_p);
  tracing::info!("Sign-in pipeline registered.");
}
