// server/src/services/validation.rs

//! Input rules shared by the HTTP handlers and the pipelines. Every failure is
//! a `BadRequest` carrying the first broken rule.

use crate::errors::{AppError, Result};
use crate::models::{OrderItemInput, MONEY_SCALE};
use rust_decimal::Decimal;

const MIN_NAME_LEN: usize = 3;
const MIN_USERNAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

fn bad(message: impl Into<String>) -> AppError {
  AppError::BadRequest(message.into())
}

fn require(value: &str, field: &str) -> Result<()> {
  if value.trim().is_empty() {
    return Err(bad(format!("{} is required", field)));
  }
  Ok(())
}

fn full_name(value: &str) -> Result<()> {
  require(value, "Full name")?;
  if value.trim().chars().count() < MIN_NAME_LEN {
    return Err(bad(format!("Full name must be at least {} characters", MIN_NAME_LEN)));
  }
  Ok(())
}

fn password(value: &str) -> Result<()> {
  if value.chars().count() < MIN_PASSWORD_LEN {
    return Err(bad(format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
  }
  Ok(())
}

/// Rejects values with more decimal places than money columns store.
pub fn money_scale(value: Decimal, field: &str) -> Result<()> {
  if value.normalize().scale() > MONEY_SCALE {
    return Err(bad(format!("{} allows at most {} decimal places", field, MONEY_SCALE)));
  }
  Ok(())
}

pub fn signup(full: &str, username: &str, pass: &str, confirm_password: &str) -> Result<()> {
  full_name(full)?;
  require(username, "Username")?;
  if username.chars().count() < MIN_USERNAME_LEN {
    return Err(bad(format!("Username must be at least {} characters", MIN_USERNAME_LEN)));
  }
  if !username.chars().all(|c| c.is_ascii_alphanumeric()) {
    return Err(bad("Username may only contain letters and digits"));
  }
  require(pass, "Password")?;
  password(pass)?;
  require(confirm_password, "Password confirmation")?;
  if pass != confirm_password {
    return Err(bad("Passwords do not match"));
  }
  Ok(())
}

pub fn login(username: &str, pass: &str) -> Result<()> {
  require(username, "Username")?;
  require(pass, "Password")
}

pub fn profile(full: &str, new_password: Option<&str>) -> Result<()> {
  full_name(full)?;
  match new_password {
    Some(new_password) if !new_password.is_empty() => password(new_password),
    _ => Ok(()),
  }
}

pub fn service(service_name: &str, price: Decimal) -> Result<()> {
  require(service_name, "Service name")?;
  if price.is_sign_negative() {
    return Err(bad("Price must not be negative"));
  }
  money_scale(price, "Price")
}

pub fn order_header(customer_name: &str, phone_number: &str) -> Result<()> {
  require(customer_name, "Customer name")?;
  require(phone_number, "Phone number")
}

pub fn order_items(items: &[OrderItemInput]) -> Result<()> {
  if items.is_empty() {
    return Err(bad("Order must contain at least one item"));
  }
  for (index, item) in items.iter().enumerate() {
    if item.quantity <= Decimal::ZERO {
      return Err(bad(format!("Item {} must have a quantity greater than zero", index + 1)));
    }
    money_scale(item.quantity, "Quantity")?;
  }
  Ok(())
}
