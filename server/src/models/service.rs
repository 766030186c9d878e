// server/src/models/service.rs

use crate::errors::AppError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Unit a catalog entry is priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceUnit {
  /// weight
  Kg,
  Piece,
  Pair,
  /// area
  M2,
}

impl ServiceUnit {
  pub fn as_str(&self) -> &'static str {
    match self {
      ServiceUnit::Kg => "kg",
      ServiceUnit::Piece => "piece",
      ServiceUnit::Pair => "pair",
      ServiceUnit::M2 => "m2",
    }
  }
}

impl fmt::Display for ServiceUnit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for ServiceUnit {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_ascii_lowercase().as_str() {
      "kg" => Ok(ServiceUnit::Kg),
      "piece" => Ok(ServiceUnit::Piece),
      "pair" => Ok(ServiceUnit::Pair),
      "m2" => Ok(ServiceUnit::M2),
      other => Err(AppError::BadRequest(format!(
        "Invalid unit '{}': expected one of kg, piece, pair, m2",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Service {
  pub id: i64,
  pub service_name: String,
  pub unit: ServiceUnit,
  pub price: Decimal,
  pub description: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ServiceRow {
  pub id: i64,
  pub service_name: String,
  pub unit: String,
  pub price: Decimal,
  pub description: Option<String>,
  pub is_active: bool,
  pub created_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for Service {
  type Error = AppError;

  fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
    let unit = row
      .unit
      .parse()
      .map_err(|_| AppError::Internal(format!("Unknown unit '{}' stored for service {}", row.unit, row.id)))?;
    Ok(Service {
      id: row.id,
      service_name: row.service_name,
      unit,
      price: row.price,
      description: row.description,
      is_active: row.is_active,
      created_at: row.created_at,
    })
  }
}

/// Every field of a catalog entry that create and update write.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDraft {
  pub service_name: String,
  pub unit: ServiceUnit,
  pub price: Decimal,
  pub description: Option<String>,
  pub is_active: bool,
}
