// server/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CHAT_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";

/// A string that never shows up in `Debug` output or logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
  pub fn new(value: impl Into<String>) -> Self {
    Secret(value.into())
  }

  pub fn expose(&self) -> &str {
    &self.0
  }
}

impl fmt::Debug for Secret {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("[REDACTED]")
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  MySql,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "mysql" => Ok(StorageBackend::MySql),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'mysql' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: Secret,
  pub name: String,
  pub pool_size: u32,
  pub run_migrations: bool,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
  /// Without a key the assistant answers every request with an internal error.
  pub api_key: Option<Secret>,
  pub api_url: String,
  pub model: String,
  pub temperature: f32,
  pub max_tokens: u32,
  pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub app_env: String,
  /// Whether error bodies carry the internal `detail` field.
  pub expose_error_details: bool,
  pub storage_backend: StorageBackend,
  pub database: DatabaseConfig,

  pub jwt_secret: Secret,
  pub jwt_ttl_hours: i64,

  pub chat: ChatConfig,

  // Startup seeding of the admin account and the default catalog
  pub seed_db: bool,
  pub admin_username: String,
  pub admin_password: Option<Secret>,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|var_name| env::var(var_name).ok())
  }

  /// Builds the configuration from any variable source; `from_env` passes the
  /// process environment.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get_env = |var_name: &str| {
      lookup(var_name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", var_name)))
    };
    let env_or = |var_name: &str, default: &str| get_env(var_name).unwrap_or_else(|_| default.to_string());

    let server_host = env_or("SERVER_HOST", "127.0.0.1");
    let server_port = get_env("SERVER_PORT")
      .or_else(|_| get_env("PORT"))
      .unwrap_or_else(|_| "3000".to_string());
    let server_port = parse_value::<u16>("SERVER_PORT", &server_port)?;
    let app_env = env_or("APP_ENV", "development");
    let expose_error_details = match get_env("EXPOSE_ERROR_DETAILS") {
      Ok(raw) => parse_value("EXPOSE_ERROR_DETAILS", &raw)?,
      Err(_) => !app_env.eq_ignore_ascii_case("production"),
    };
    let storage_backend = env_or("STORAGE_BACKEND", "mysql").parse::<StorageBackend>()?;

    let database = DatabaseConfig {
      host: env_or("DB_HOST", "localhost"),
      port: parse_value("DB_PORT", &env_or("DB_PORT", "3306"))?,
      user: env_or("DB_USER", "root"),
      password: Secret::new(lookup("DB_PASSWORD").unwrap_or_default()),
      name: env_or("DB_NAME", "mory_laundry"),
      pool_size: parse_value("DB_POOL_SIZE", &env_or("DB_POOL_SIZE", "10"))?,
      run_migrations: parse_value("RUN_MIGRATIONS", &env_or("RUN_MIGRATIONS", "true"))?,
    };
    if database.pool_size == 0 {
      return Err(AppError::Config("DB_POOL_SIZE must be at least 1".to_string()));
    }

    let jwt_secret = Secret::new(get_env("JWT_SECRET")?);
    let jwt_ttl_hours: i64 = parse_value("JWT_TTL_HOURS", &env_or("JWT_TTL_HOURS", "24"))?;
    if jwt_ttl_hours <= 0 {
      return Err(AppError::Config("JWT_TTL_HOURS must be positive".to_string()));
    }

    let chat = ChatConfig {
      api_key: get_env("CHAT_API_KEY").ok().map(Secret::new),
      api_url: env_or("CHAT_API_URL", DEFAULT_CHAT_API_URL),
      model: env_or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
      temperature: parse_value("CHAT_TEMPERATURE", &env_or("CHAT_TEMPERATURE", "0.7"))?,
      max_tokens: parse_value("CHAT_MAX_TOKENS", &env_or("CHAT_MAX_TOKENS", "1024"))?,
      timeout_secs: parse_value("CHAT_TIMEOUT_SECS", &env_or("CHAT_TIMEOUT_SECS", "30"))?,
    };

    let seed_db = parse_value("SEED_DB", &env_or("SEED_DB", "false"))?;
    let admin_username = env_or("ADMIN_USERNAME", "admin");
    let admin_password = get_env("ADMIN_PASSWORD").ok().map(Secret::new);
    if seed_db && admin_password.is_none() {
      return Err(AppError::Config("ADMIN_PASSWORD is required when SEED_DB=true".to_string()));
    }

    tracing::info!(
      env = %app_env,
      backend = ?storage_backend,
      chat_enabled = chat.api_key.is_some(),
      "Application configuration loaded successfully."
    );

    Ok(Self {
      server_host,
      server_port,
      app_env,
      expose_error_details,
      storage_backend,
      database,
      jwt_secret,
      jwt_ttl_hours,
      chat,
      seed_db,
      admin_username,
      admin_password,
    })
  }

  pub fn is_production(&self) -> bool {
    self.app_env.eq_ignore_ascii_case("production")
  }
}

fn parse_value<T>(var_name: &str, raw: &str) -> Result<T>
where
  T: FromStr,
  T::Err: fmt::Display,
{
  raw
    .trim()
    .parse::<T>()
    .map_err(|e| AppError::Config(format!("Invalid {} value '{}': {}", var_name, raw, e)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn defaults_apply_when_only_the_secret_is_set() {
    let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret")])).unwrap();
    assert_eq!(config.server_port, 3000);
    assert_eq!(config.storage_backend, StorageBackend::MySql);
    assert_eq!(config.database.port, 3306);
    assert_eq!(config.database.pool_size, 10);
    assert_eq!(config.jwt_ttl_hours, 24);
    assert_eq!(config.chat.model, DEFAULT_CHAT_MODEL);
    assert_eq!(config.chat.max_tokens, 1024);
    assert!(config.chat.api_key.is_none());
    assert!(!config.is_production());
    assert!(config.expose_error_details);
  }

  #[test]
  fn production_hides_error_details_unless_overridden() {
    let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "s3cret"), ("APP_ENV", "production")])).unwrap();
    assert!(config.is_production());
    assert!(!config.expose_error_details);

    let config = AppConfig::from_lookup(lookup_from(&[
      ("JWT_SECRET", "s3cret"),
      ("APP_ENV", "production"),
      ("EXPOSE_ERROR_DETAILS", "true"),
    ]))
    .unwrap();
    assert!(config.expose_error_details);
  }

  #[test]
  fn missing_jwt_secret_is_a_config_error() {
    let err = AppConfig::from_lookup(lookup_from(&[])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("JWT_SECRET")));
  }

  #[test]
  fn port_falls_back_to_port_variable() {
    let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("PORT", "8088")])).unwrap();
    assert_eq!(config.server_port, 8088);
  }

  #[test]
  fn invalid_values_are_rejected() {
    let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("DB_PORT", "abc")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("DB_PORT")));

    let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("STORAGE_BACKEND", "sqlite")])).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
  }

  #[test]
  fn seeding_requires_an_admin_password() {
    let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "x"), ("SEED_DB", "true")])).unwrap_err();
    assert!(matches!(err, AppError::Config(m) if m.contains("ADMIN_PASSWORD")));
  }

  #[test]
  fn secrets_are_redacted_in_debug_output() {
    let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "super-secret-value")])).unwrap();
    let rendered = format!("{:?}", config);
    assert!(!rendered.contains("super-secret-value"));
    assert!(rendered.contains("[REDACTED]"));
  }
}
