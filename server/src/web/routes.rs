// server/src/web/routes.rs

use actix_web::dev::Service;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::handlers::{auth_handlers, chat_handlers, order_handlers, service_handlers, user_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Mory Laundry API is running",
    "timestamp": Utc::now(),
  }))
}

async fn not_found_handler(req: HttpRequest) -> Result<HttpResponse, AppError> {
  debug!(path = %req.path(), "No route matched.");
  Err(AppError::NotFound("Endpoint not found".to_string()))
}

fn bad_request(kind: &str, err: impl std::fmt::Display) -> actix_web::Error {
  AppError::BadRequest(format!("Invalid {}: {}", kind, err)).into()
}

/// Mounts every endpoint under `/api` and makes extractor failures answer
/// with the usual error envelope.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(web::JsonConfig::default().error_handler(|err, _req| bad_request("request body", err)))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| bad_request("query string", err)))
    .app_data(web::PathConfig::default().error_handler(|err, _req| bad_request("path parameter", err)))
    .service(
      web::scope("/api")
        .wrap_fn(|req, srv| {
          // Error bodies are built without `detail`; put it back when the
          // configuration allows it.
          let expose = req
            .app_data::<web::Data<AppState>>()
            .is_some_and(|state| state.config.expose_error_details);
          let fut = srv.call(req);
          async move {
            let res = fut.await?;
            if !expose {
              return Ok::<_, actix_web::Error>(res);
            }
            let detailed = res
              .response()
              .error()
              .and_then(|err| err.as_error::<AppError>())
              .map(AppError::detailed_response);
            Ok(match detailed {
              Some(response) => res.into_response(response),
              None => res,
            })
          }
        })
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/auth")
            .route("/signup", web::post().to(auth_handlers::signup_handler))
            .route("/login", web::post().to(auth_handlers::login_handler))
            .route("/me", web::get().to(auth_handlers::me_handler))
            .route("/profile", web::put().to(auth_handlers::update_profile_handler)),
        )
        .service(
          web::scope("/services")
            .route("", web::get().to(service_handlers::list_active_services_handler))
            .route("", web::post().to(service_handlers::create_service_handler))
            .route("/admin/all", web::get().to(service_handlers::list_all_services_handler))
            .route("/{id}", web::get().to(service_handlers::get_service_handler))
            .route("/{id}", web::put().to(service_handlers::update_service_handler))
            .route("/{id}", web::delete().to(service_handlers::delete_service_handler)),
        )
        // Literal segments go before `/{id}` so they are not parsed as ids.
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("", web::post().to(order_handlers::create_order_handler))
            .route("/my-orders", web::get().to(order_handlers::my_orders_handler))
            .route("/my-stats", web::get().to(order_handlers::my_stats_handler))
            .route("/stats", web::get().to(order_handlers::stats_handler))
            .route("/{id}", web::get().to(order_handlers::get_order_handler))
            .route("/{id}/status", web::put().to(order_handlers::update_status_handler))
            .route("/{id}/cancel", web::put().to(order_handlers::cancel_order_handler)),
        )
        .service(
          web::scope("/users")
            .route("", web::get().to(user_handlers::list_users_handler))
            .route("/{id}", web::get().to(user_handlers::get_user_handler))
            .route("/{id}", web::delete().to(user_handlers::delete_user_handler)),
        )
        .service(web::scope("/chat").route("", web::post().to(chat_handlers::chat_handler))),
    )
    .default_service(web::to(not_found_handler));
}
