// server/src/errors.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use laundry_flow::FlowError;
use serde_json::json;
use thiserror::Error;

/// Message used when the storage layer rejects a duplicate unique value.
pub const DUPLICATE_DATA: &str = "data already exists";
/// Message used when a written row points at data that does not exist.
pub const REFERENCED_DATA: &str = "referenced data not found";
/// Message used when a delete is blocked because other rows still point at the row.
pub const STILL_REFERENCED: &str = "data is still used by existing orders";

// MySQL reports a delete blocked by a referencing row as 1451 and an insert
// pointing at a missing row as 1452.
const ER_ROW_IS_REFERENCED_2: u16 = 1451;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Resource not found: {0}")]
  NotFound(String),

  #[error("Conflict: {0}")]
  Conflict(String),

  #[error("Too many requests: {0}")]
  TooManyRequests(String),

  #[error("Internal server error: {0}")]
  Internal(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Database error: {0}")]
  Database(sqlx::Error),

  #[error("Workflow error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },
}

impl AppError {
  /// The short, user-facing text placed in the `message` field.
  fn public_message(&self) -> &str {
    match self {
      AppError::BadRequest(m)
      | AppError::Unauthorized(m)
      | AppError::Forbidden(m)
      | AppError::NotFound(m)
      | AppError::Conflict(m)
      | AppError::TooManyRequests(m)
      | AppError::Internal(m) => m,
      AppError::Config(_) => "Configuration issue",
      AppError::Database(_) => "Database operation failed",
      AppError::Workflow { .. } => "Workflow processing error",
    }
  }

  /// Internal text only shown outside production.
  fn detail(&self) -> Option<String> {
    match self {
      AppError::Config(m) => Some(m.clone()),
      AppError::Database(e) => Some(e.to_string()),
      AppError::Workflow { source } => Some(source.to_string()),
      AppError::Internal(_) => Some(self.to_string()),
      _ => None,
    }
  }
}

/// Maps a foreign-key violation by its MySQL error number. Only a blocked
/// delete is a conflict; any other violation means the caller referenced
/// missing data.
fn foreign_key_violation(number: Option<u16>) -> AppError {
  match number {
    Some(ER_ROW_IS_REFERENCED_2) => AppError::Conflict(STILL_REFERENCED.to_string()),
    _ => AppError::BadRequest(REFERENCED_DATA.to_string()),
  }
}

// Constraint violations are the caller's fault, everything else stays a 500.
impl From<sqlx::Error> for AppError {
  fn from(err: sqlx::Error) -> Self {
    if let sqlx::Error::Database(db_err) = &err {
      match db_err.kind() {
        sqlx::error::ErrorKind::UniqueViolation => return AppError::Conflict(DUPLICATE_DATA.to_string()),
        sqlx::error::ErrorKind::ForeignKeyViolation => {
          let number = db_err
            .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
            .map(|mysql_err| mysql_err.number());
          return foreign_key_violation(number);
        }
        _ => {}
      }
    }
    AppError::Database(err)
  }
}

impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(other) => AppError::Internal(other.to_string()),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
      AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) => StatusCode::NOT_FOUND,
      AppError::Conflict(_) => StatusCode::CONFLICT,
      AppError::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
      AppError::Internal(_) | AppError::Config(_) | AppError::Database(_) | AppError::Workflow { .. } => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  // The plain envelope never carries `detail`; `web::routes` swaps in
  // `detailed_response` when the configuration allows it.
  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, "Responding with error");
    } else {
      tracing::warn!(application_error = %self, status = status.as_u16(), "Responding with client error");
    }
    self.envelope(false)
  }
}

impl AppError {
  /// The error envelope including the internal `detail`, when there is one.
  pub fn detailed_response(&self) -> HttpResponse {
    self.envelope(true)
  }

  fn envelope(&self, with_detail: bool) -> HttpResponse {
    let mut body = json!({
      "success": false,
      "message": self.public_message(),
    });
    if let Some(detail) = self.detail().filter(|_| with_detail) {
      body["detail"] = json!(detail);
    }
    HttpResponse::build(self.status_code()).json(body)
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;
  use actix_web::body::to_bytes;

  #[actix_web::test]
  async fn client_errors_use_their_own_message() {
    let err = AppError::NotFound("order not found".to_string());
    assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

    let body = to_bytes(err.error_response().into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["success"], false);
    assert_eq!(value["message"], "order not found");
    assert!(value.get("detail").is_none());
  }

  #[actix_web::test]
  async fn detail_only_appears_in_the_detailed_response() {
    let err = AppError::Internal("pool exhausted".to_string());

    let body = to_bytes(err.error_response().into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["message"], "pool exhausted");
    assert!(value.get("detail").is_none());

    let resp = err.detailed_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = to_bytes(resp.into_body()).await.unwrap();
    let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(value["detail"], "Internal server error: pool exhausted");
  }

  #[test]
  fn foreign_key_violations_split_on_direction() {
    let err = foreign_key_violation(Some(1451));
    assert!(matches!(&err, AppError::Conflict(m) if m == STILL_REFERENCED));
    assert_eq!(err.status_code(), StatusCode::CONFLICT);

    let err = foreign_key_violation(Some(1452));
    assert!(matches!(&err, AppError::BadRequest(m) if m == REFERENCED_DATA));
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);

    assert!(matches!(foreign_key_violation(None), AppError::BadRequest(_)));
  }

  #[test]
  fn row_not_found_stays_a_database_error() {
    let err = AppError::from(sqlx::Error::RowNotFound);
    assert!(matches!(err, AppError::Database(_)));
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(err.public_message(), "Database operation failed");
  }

  #[test]
  fn anyhow_wrapping_an_app_error_keeps_it() {
    let err = AppError::from(anyhow::Error::new(AppError::Forbidden("nope".to_string())));
    assert!(matches!(err, AppError::Forbidden(m) if m == "nope"));

    let err = AppError::from(anyhow::anyhow!("boom"));
    assert!(matches!(err, AppError::Internal(m) if m == "boom"));
  }

  #[test]
  fn flow_errors_become_workflow_errors() {
    let err = AppError::from(FlowError::HandlerMissing {
      step_name: "persist_order".to_string(),
    });
    assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(err.detail().unwrap_or_default().contains("persist_order"));
  }
}
