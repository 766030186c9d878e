// server/src/main.rs

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use mory_laundry::config::{AppConfig, StorageBackend};
use mory_laundry::db::{self, MemoryStore, MySqlStore, Stores};
use mory_laundry::services::completion_client::{CompletionClient, GroqClient};
use mory_laundry::state::AppState;
use mory_laundry::web::configure_app_routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting Mory Laundry server...");

  let app_config = AppConfig::from_env().context("loading configuration")?;

  let stores = match app_config.storage_backend {
    StorageBackend::MySql => {
      let pool = db::mysql::connect(&app_config.database)
        .await
        .context("connecting to MySQL")?;
      tracing::info!("Successfully connected to the database.");
      if app_config.database.run_migrations {
        db::mysql::migrate(&pool).await.context("running migrations")?;
      }
      Stores::from_backend(Arc::new(MySqlStore::new(pool)))
    }
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      Stores::from_backend(Arc::new(MemoryStore::new()))
    }
  };

  if app_config.seed_db {
    db::seed::seed(&stores, &app_config).await.context("seeding the database")?;
  }

  let assistant: Option<Arc<dyn CompletionClient>> = match &app_config.chat.api_key {
    Some(key) => Some(Arc::new(
      GroqClient::new(&app_config.chat, key.expose()).context("building the completion client")?,
    )),
    None => {
      tracing::warn!("CHAT_API_KEY is not set; the chat assistant is disabled.");
      None
    }
  };

  let server_address = format!("{}:{}", app_config.server_host, app_config.server_port);
  let app_state = AppState::new(app_config, stores, assistant);
  tracing::info!("Pipelines registered. Binding server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(web::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)
  .with_context(|| format!("binding {}", server_address))?
  .run()
  .await?;

  Ok(())
}
