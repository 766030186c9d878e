// server/src/web/response.rs

//! The `{success, message?, data?, count?}` envelope every endpoint answers with.

use actix_web::HttpResponse;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub message: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data: Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub count: Option<usize>,
}

impl ApiResponse<()> {
  pub fn message(message: impl Into<String>) -> Self {
    ApiResponse {
      success: true,
      message: Some(message.into()),
      data: None,
      count: None,
    }
  }
}

impl<T: Serialize> ApiResponse<T> {
  pub fn data(data: T) -> Self {
    ApiResponse {
      success: true,
      message: None,
      data: Some(data),
      count: None,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn ok(self) -> HttpResponse {
    HttpResponse::Ok().json(self)
  }

  pub fn created(self) -> HttpResponse {
    HttpResponse::Created().json(self)
  }
}

impl<T: Serialize> ApiResponse<Vec<T>> {
  /// A list payload with its length in `count`.
  pub fn list(items: Vec<T>) -> Self {
    ApiResponse {
      success: true,
      message: None,
      count: Some(items.len()),
      data: Some(items),
    }
  }
}
