// server/src/db/seed.rs

use crate::config::AppConfig;
use crate::db::Stores;
use crate::errors::{AppError, Result};
use crate::models::{NewAccount, Role, ServiceDraft, ServiceUnit};
use crate::services::auth_service;
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// Catalog written into an empty `services` table: name, unit, price, description.
const DEFAULT_CATALOG: &[(&str, ServiceUnit, i64, &str)] = &[
  ("Wash & Fold", ServiceUnit::Kg, 7000, "Washed, dried and neatly folded"),
  ("Wash & Iron", ServiceUnit::Kg, 9000, "Washed, dried and ironed"),
  ("Iron Only", ServiceUnit::Kg, 5000, "Ironing for clean clothes"),
  ("Bed Cover", ServiceUnit::Piece, 25000, "Bed covers and blankets"),
  ("Shoes", ServiceUnit::Pair, 30000, "Deep cleaning for one pair of shoes"),
  ("Carpet", ServiceUnit::M2, 15000, "Carpet wash, priced per square metre"),
];

/// Ensures the admin account and the default catalog exist. Safe to run on every start.
#[instrument(name = "db::seed", skip_all, fields(admin = %config.admin_username))]
pub async fn seed(stores: &Stores, config: &AppConfig) -> Result<()> {
  let password = config
    .admin_password
    .as_ref()
    .ok_or_else(|| AppError::Config("ADMIN_PASSWORD is required for seeding".to_string()))?;

  match stores.accounts.find_by_username(&config.admin_username).await? {
    Some(existing) if existing.is_admin() => info!("Admin account already present."),
    Some(_) => warn!("Seed username belongs to a customer account; leaving it untouched."),
    None => {
      let account = NewAccount {
        username: config.admin_username.clone(),
        full_name: "Administrator".to_string(),
        phone_number: None,
        password_hash: auth_service::hash_password(password.expose())?,
        role: Role::Admin,
      };
      let id = stores.accounts.insert_account(&account).await?;
      info!(account_id = id, "Admin account created.");
    }
  }

  if stores.catalog.count_services().await? > 0 {
    info!("Service catalog already populated.");
    return Ok(());
  }
  for (name, unit, price, description) in DEFAULT_CATALOG {
    stores
      .catalog
      .insert_service(&ServiceDraft {
        service_name: name.to_string(),
        unit: *unit,
        price: Decimal::new(*price, 0),
        description: Some(description.to_string()),
        is_active: true,
      })
      .await?;
  }
  info!(count = DEFAULT_CATALOG.len(), "Default service catalog created.");
  Ok(())
}
