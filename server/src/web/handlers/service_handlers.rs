// server/src/web/handlers/service_handlers.rs

use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{Service, ServiceDraft, ServiceUnit};
use crate::services::validation;
use crate::state::AppState;
use crate::web::extractors::AdminUser;
use crate::web::response::ApiResponse;

/// `is_active` as clients send it: a JSON boolean or 0/1.
#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(untagged)]
pub enum ActiveFlag {
  Bool(bool),
  Number(i64),
}

impl From<ActiveFlag> for bool {
  fn from(flag: ActiveFlag) -> bool {
    match flag {
      ActiveFlag::Bool(value) => value,
      ActiveFlag::Number(value) => value != 0,
    }
  }
}

#[derive(Deserialize, Debug)]
pub struct ServiceRequestPayload {
  pub service_name: String,
  pub unit: String,
  pub price: Decimal,
  #[serde(default)]
  pub description: Option<String>,
  #[serde(default)]
  pub is_active: Option<ActiveFlag>,
}

impl ServiceRequestPayload {
  /// A missing `is_active` means active, on create and on update alike.
  fn into_draft(self) -> Result<ServiceDraft, AppError> {
    validation::service(&self.service_name, self.price)?;
    Ok(ServiceDraft {
      service_name: self.service_name.trim().to_string(),
      unit: self.unit.parse::<ServiceUnit>()?,
      price: self.price,
      description: self.description.filter(|d| !d.trim().is_empty()),
      is_active: self.is_active.map(bool::from).unwrap_or(true),
    })
  }
}

async fn find_or_404(app_state: &AppState, id: i64) -> Result<Service, AppError> {
  app_state
    .stores
    .catalog
    .find_service(id)
    .await?
    .ok_or_else(|| AppError::NotFound("Service not found".to_string()))
}

#[instrument(name = "handler::list_active_services", skip(app_state))]
pub async fn list_active_services_handler(app_state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
  let services = app_state.stores.catalog.list_active_services().await?;
  Ok(ApiResponse::list(services).ok())
}

#[instrument(name = "handler::list_all_services", skip_all, fields(admin_id = admin.account.id))]
pub async fn list_all_services_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let services = app_state.stores.catalog.list_services().await?;
  Ok(ApiResponse::list(services).ok())
}

#[instrument(name = "handler::get_service", skip(app_state, path), fields(service_id = %path.as_ref()))]
pub async fn get_service_handler(
  app_state: web::Data<AppState>,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  let service = find_or_404(&app_state, path.into_inner()).await?;
  Ok(ApiResponse::data(service).ok())
}

#[instrument(name = "handler::create_service", skip_all, fields(admin_id = admin.account.id))]
pub async fn create_service_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  req_payload: web::Json<ServiceRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let draft = req_payload.into_inner().into_draft()?;
  let id = app_state.stores.catalog.insert_service(&draft).await?;
  let service = find_or_404(&app_state, id).await?;

  info!(service_id = id, name = %service.service_name, "Service created.");
  Ok(ApiResponse::data(service).with_message("Service created").created())
}

#[instrument(name = "handler::update_service", skip_all, fields(admin_id = admin.account.id, service_id = %path.as_ref()))]
pub async fn update_service_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
  req_payload: web::Json<ServiceRequestPayload>,
) -> Result<HttpResponse, AppError> {
  let id = path.into_inner();
  find_or_404(&app_state, id).await?;

  let draft = req_payload.into_inner().into_draft()?;
  app_state.stores.catalog.update_service(id, &draft).await?;
  let service = find_or_404(&app_state, id).await?;

  info!(is_active = service.is_active, "Service updated.");
  Ok(ApiResponse::data(service).with_message("Service updated").ok())
}

#[instrument(name = "handler::delete_service", skip_all, fields(admin_id = admin.account.id, service_id = %path.as_ref()))]
pub async fn delete_service_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
  if !app_state.stores.catalog.delete_service(path.into_inner()).await? {
    return Err(AppError::NotFound("Service not found".to_string()));
  }
  info!("Service deleted.");
  Ok(ApiResponse::message("Service deleted").ok())
}
