// server/src/services/token_service.rs

//! Signed, time-limited session tokens (HS256 JWT).

use crate::errors::AppError;
use crate::models::{Account, Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  /// Account id, as a string.
  pub sub: String,
  pub username: String,
  pub role: Role,
  pub iat: i64,
  pub exp: i64,
}

impl Claims {
  pub fn account_id(&self) -> Result<i64, TokenError> {
    self.sub.parse().map_err(|_| TokenError::Invalid)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
  #[error("invalid token")]
  Invalid,
  #[error("token expired")]
  Expired,
}

impl From<TokenError> for AppError {
  fn from(err: TokenError) -> Self {
    match err {
      TokenError::Invalid => AppError::Unauthorized("Invalid token".to_string()),
      TokenError::Expired => AppError::Unauthorized("Token expired, please log in again".to_string()),
    }
  }
}

#[derive(Clone)]
pub struct TokenKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl: Duration,
}

impl TokenKeys {
  pub fn from_secret(secret: &str, ttl_hours: i64) -> Self {
    TokenKeys {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl: Duration::hours(ttl_hours),
    }
  }

  pub fn issue(&self, account: &Account) -> Result<String, AppError> {
    self.issue_at(account, Utc::now())
  }

  #[instrument(name = "token_service::issue", skip(self, account), fields(account_id = account.id), err(Display))]
  pub fn issue_at(&self, account: &Account, issued_at: DateTime<Utc>) -> Result<String, AppError> {
    let claims = Claims {
      sub: account.id.to_string(),
      username: account.username.clone(),
      role: account.role,
      iat: issued_at.timestamp(),
      exp: (issued_at + self.ttl).timestamp(),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
  }

  pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    decode::<Claims>(token, &self.decoding, &validation)
      .map(|data| data.claims)
      .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        other => {
          debug!(error = ?other, "Token rejected.");
          TokenError::Invalid
        }
      })
  }
}
