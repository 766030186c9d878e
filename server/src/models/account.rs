// server/src/models/account.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  Customer,
  Admin,
}

impl Role {
  pub fn as_str(&self) -> &'static str {
    match self {
      Role::Customer => "customer",
      Role::Admin => "admin",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "customer" => Ok(Role::Customer),
      "admin" => Ok(Role::Admin),
      other => Err(AppError::Internal(format!("Unknown account role '{}' in storage", other))),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Account {
  pub id: i64,
  pub username: String,
  pub full_name: String,
  pub phone_number: Option<String>,
  pub role: Role,
  #[serde(skip_serializing)] // Never send password hash to client
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

impl Account {
  pub fn is_admin(&self) -> bool {
    self.role == Role::Admin
  }
}

/// Storage row; the role column is plain text.
#[derive(Debug, Clone, FromRow)]
pub struct AccountRow {
  pub id: i64,
  pub username: String,
  pub full_name: String,
  pub phone_number: Option<String>,
  pub role: String,
  pub password_hash: String,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
  type Error = AppError;

  fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
    Ok(Account {
      id: row.id,
      username: row.username,
      full_name: row.full_name,
      phone_number: row.phone_number,
      role: row.role.parse()?,
      password_hash: row.password_hash,
      created_at: row.created_at,
    })
  }
}

#[derive(Debug, Clone)]
pub struct NewAccount {
  pub username: String,
  pub full_name: String,
  pub phone_number: Option<String>,
  pub password_hash: String,
  pub role: Role,
}

/// Name and phone are always written; the hash only when a new password was given.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
  pub full_name: String,
  pub phone_number: Option<String>,
  pub password_hash: Option<String>,
}
