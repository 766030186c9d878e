// server/src/pipelines/signup_pipeline.rs

use crate::errors::AppError;
use crate::models::{NewAccount, Role};
use crate::pipelines::contexts::SignupCtxData;
use crate::services::{auth_service, validation};
use laundry_flow::{ContextData, FlowRegistry, Pipeline, PipelineControl};
use tracing::{event, info, warn, Level};

/// Registers the customer sign-up pipeline.
pub fn register_signup_pipeline(flows: &FlowRegistry<AppError>) {
  let mut signup_p = Pipeline::<SignupCtxData, AppError>::new(&[
    ("validate_signup_input", false, None),
    ("check_existing_username", false, None),
    ("create_account", false, None),
  ]);

  // Step 1: Validate input
  signup_p.on_root("validate_signup_input", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      ctx_data.with(|c| validation::signup(&c.full_name, &c.username, &c.password, &c.confirm_password))?;
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 2: Reject taken usernames before spending time on hashing.
  // Two concurrent sign-ups can both pass this check; the unique index on
  // `users.username` turns the loser's insert into a 409 as well.
  signup_p.on_root("check_existing_username", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (username, accounts) = ctx_data.with(|c| (c.username.clone(), c.app_state.stores.accounts.clone()));

      event!(Level::DEBUG, %username, "Checking if username already exists.");
      if accounts.username_exists(&username).await? {
        warn!(%username, "Attempt to sign up with an existing username.");
        return Err(AppError::Conflict("Username is already taken".to_string()));
      }
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  // Step 3: Hash the password and store the account. Role is always customer.
  signup_p.on_root("create_account", |ctx_data: ContextData<SignupCtxData>| {
    Box::pin(async move {
      let (new_account, password, accounts) = ctx_data.with(|c| {
        (
          NewAccount {
            username: c.username.clone(),
            full_name: c.full_name.trim().to_string(),
            phone_number: c.phone_number.clone().filter(|p| !p.trim().is_empty()),
            password_hash: String::new(),
            role: Role::Customer,
          },
          c.password.clone(),
          c.app_state.stores.accounts.clone(),
        )
      });

      let new_account = NewAccount {
        password_hash: auth_service::hash_password(&password)?,
        ..new_account
      };
      let id = accounts.insert_account(&new_account).await?;

      ctx_data.write().created_account_id = Some(id);
      info!(account_id = id, username = %new_account.username, "Account created.");
      Ok::<_, AppError>(PipelineControl::Continue)
    })
  });

  flows.register_pipeline(signup_p);
  tracing::info!("Sign-up pipeline registered.");
}
