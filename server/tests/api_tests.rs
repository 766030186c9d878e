// tests/api_tests.rs
#[macro_use]
mod common;

use actix_web::http::StatusCode;
use actix_web::test::TestRequest;
use common::*;
use mory_laundry::models::OrderStatus;
use rust_decimal::Decimal;
use serde_json::json;

#[actix_web::test]
async fn test_customer_signs_up_orders_and_admin_completes() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let wash_fold = service_named(&state, "Wash & Fold").await;
  let bed_cover = service_named(&state, "Bed Cover").await;

  let (status, body) = call!(
    app,
    TestRequest::post().uri("/api/auth/signup").set_json(json!({
      "full_name": "Alice Wonder",
      "username": "alice",
      "phone_number": "08123456789",
      "password": "secret1",
      "confirm_password": "secret1"
    }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  assert_eq!(body["success"], true);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({"username": "alice", "password": "secret1"}))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["data"]["user"]["role"], "customer");
  assert!(body["data"]["user"].get("password_hash").is_none());
  let token = body["data"]["token"].as_str().unwrap().to_string();

  let (status, body) = call!(app, TestRequest::get().uri("/api/auth/me").insert_header(bearer(&token)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["username"], "alice");

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({
        "customer_name": "Alice Wonder",
        "phone_number": "08123456789",
        "address": "Jl. Melati 7",
        "items": [
          {"service_id": wash_fold.id, "quantity": 2},
          {"service_id": bed_cover.id, "quantity": 1, "price": 1}
        ]
      }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  let order = &body["data"];
  assert_eq!(order["status"], "queued");
  assert_eq!(decimal(&order["total_price"]), Decimal::new(39000, 0));
  assert_eq!(order["details"].as_array().unwrap().len(), 2);
  assert!(order["completed_date"].is_null());
  let order_number = order["order_number"].as_str().unwrap();
  assert!(order_number.starts_with("MRY"));
  assert_eq!(order_number.len(), 11);
  let order_id = order["id"].as_i64().unwrap();

  let (_, body) = call!(app, TestRequest::get().uri("/api/orders/my-orders").insert_header(bearer(&token)));
  assert_eq!(body["count"], 1);

  let admin = admin_token(&state).await;
  let status_uri = format!("/api/orders/{}/status", order_id);
  for next in OrderStatus::LIFECYCLE.iter().skip(1) {
    let (status, body) = call!(
      app,
      TestRequest::put()
        .uri(&status_uri)
        .insert_header(bearer(&admin))
        .set_json(json!({"status": next.as_str()}))
    );
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], next.as_str());
    assert_eq!(
      body["data"]["completed_date"].is_string(),
      *next == OrderStatus::Completed,
      "completion date after moving to {}",
      next
    );
  }

  let (_, body) = call!(app, TestRequest::get().uri("/api/orders/my-stats").insert_header(bearer(&token)));
  assert_eq!(body["data"], json!({"total_orders": 1, "active_orders": 0, "completed_orders": 1, "cancelled_orders": 0}));

  let (status, body) = call!(app, TestRequest::get().uri("/api/orders/stats").insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["total_orders"], 1);
  assert_eq!(body["data"]["total_customers"], 1);
  assert_eq!(decimal(&body["data"]["total_revenue"]), Decimal::new(39000, 0));
  assert_eq!(body["data"]["today"]["orders"], 1);
}

#[actix_web::test]
async fn test_duplicate_username_is_a_conflict() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let payload = json!({
    "full_name": "Bob Builder",
    "username": "bob",
    "password": "secret1",
    "confirm_password": "secret1"
  });

  let (status, _) = call!(app, TestRequest::post().uri("/api/auth/signup").set_json(&payload));
  assert_eq!(status, StatusCode::CREATED);
  let (status, body) = call!(app, TestRequest::post().uri("/api/auth/signup").set_json(&payload));
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["success"], false);
}

#[actix_web::test]
async fn test_wrong_password_and_mismatched_confirmation() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  customer(&state, "carol", "Carol Singer").await;

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({"username": "carol", "password": "wrong-one"}))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Wrong username or password");

  let (status, _) = call!(
    app,
    TestRequest::post().uri("/api/auth/signup").set_json(json!({
      "full_name": "Dave Smith",
      "username": "dave",
      "password": "secret1",
      "confirm_password": "secret2"
    }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_customers_only_see_their_own_orders() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let service = service_named(&state, "Shoes").await;
  let (_, erin) = customer(&state, "erin", "Erin Hale").await;
  let (_, frank) = customer(&state, "frank", "Frank Ocean").await;

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&erin))
      .set_json(json!({
        "customer_name": "Erin Hale",
        "phone_number": "0811111111",
        "items": [{"service_id": service.id, "quantity": 1}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED);
  let uri = format!("/api/orders/{}", body["data"]["id"]);

  let (status, _) = call!(app, TestRequest::get().uri(&uri).insert_header(bearer(&frank)));
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, body) = call!(app, TestRequest::get().uri(&uri).insert_header(bearer(&erin)));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["user_fullname"], "Erin Hale");

  let admin = admin_token(&state).await;
  let (status, _) = call!(app, TestRequest::get().uri(&uri).insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn test_access_control_on_admin_routes() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let (_, token) = customer(&state, "gina", "Gina Lane").await;

  let (status, body) = call!(app, TestRequest::get().uri("/api/orders"));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Access denied, no token provided");

  let (status, _) = call!(app, TestRequest::get().uri("/api/orders").insert_header(bearer("not-a-token")));
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, body) = call!(app, TestRequest::get().uri("/api/orders").insert_header(bearer(&token)));
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["message"], "Access denied, admin only");

  let (status, _) = call!(app, TestRequest::get().uri("/api/users").insert_header(bearer(&token)));
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_service_update_without_flag_reactivates() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let admin = admin_token(&state).await;
  let (_, customer_token) = customer(&state, "hank", "Hank Hill").await;
  let carpet = service_named(&state, "Carpet").await;
  let uri = format!("/api/services/{}", carpet.id);

  let (status, body) = call!(
    app,
    TestRequest::put().uri(&uri).insert_header(bearer(&admin)).set_json(json!({
      "service_name": "Carpet",
      "unit": "m2",
      "price": 15000,
      "is_active": 0
    }))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["data"]["is_active"], false);

  let (_, body) = call!(app, TestRequest::get().uri("/api/services"));
  assert_eq!(body["count"], 5);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer_token))
      .set_json(json!({
        "customer_name": "Hank Hill",
        "phone_number": "0822222222",
        "items": [{"service_id": carpet.id, "quantity": 4}]
      }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().unwrap().contains("not found or inactive"));

  let (status, body) = call!(
    app,
    TestRequest::put().uri(&uri).insert_header(bearer(&admin)).set_json(json!({
      "service_name": "Carpet Deluxe",
      "unit": "m2",
      "price": 17500
    }))
  );
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["data"]["is_active"], true);
  assert_eq!(body["data"]["service_name"], "Carpet Deluxe");

  let (_, body) = call!(app, TestRequest::get().uri("/api/services/admin/all").insert_header(bearer(&admin)));
  assert_eq!(body["count"], 6);
}

#[actix_web::test]
async fn test_service_crud_and_referenced_delete() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let admin = admin_token(&state).await;
  let (_, customer_token) = customer(&state, "ivy", "Ivy Green").await;

  let (status, body) = call!(
    app,
    TestRequest::post().uri("/api/services").insert_header(bearer(&admin)).set_json(json!({
      "service_name": "Curtains",
      "unit": "piece",
      "price": "12500.50",
      "description": "Per panel"
    }))
  );
  assert_eq!(status, StatusCode::CREATED, "{}", body);
  let service_id = body["data"]["id"].as_i64().unwrap();
  let uri = format!("/api/services/{}", service_id);

  let (status, _) = call!(
    app,
    TestRequest::post().uri("/api/services").insert_header(bearer(&admin)).set_json(json!({
      "service_name": "Odd",
      "unit": "kg",
      "price": "1.005"
    }))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&customer_token))
      .set_json(json!({
        "customer_name": "Ivy Green",
        "phone_number": "0833333333",
        "items": [{"service_id": service_id, "quantity": 2}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED);

  let (status, body) = call!(app, TestRequest::delete().uri(&uri).insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["message"], "data is still used by existing orders");

  // Still listed, so the blocked delete removed nothing.
  let (status, _) = call!(app, TestRequest::get().uri(&uri));
  assert_eq!(status, StatusCode::OK);

  let (status, _) = call!(app, TestRequest::delete().uri("/api/services/9999").insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call!(app, TestRequest::get().uri("/api/services/9999"));
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_user_management() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let admin = admin_token(&state).await;
  let (jack, jack_token) = customer(&state, "jack", "Jack Frost").await;
  customer(&state, "kate", "Kate Bush").await;
  let service = service_named(&state, "Iron Only").await;

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&jack_token))
      .set_json(json!({
        "customer_name": "Jack Frost",
        "phone_number": "0844444444",
        "items": [{"service_id": service.id, "quantity": 1}]
      }))
  );
  assert_eq!(status, StatusCode::CREATED);
  let order_uri = format!("/api/orders/{}", body["data"]["id"]);

  let (_, body) = call!(app, TestRequest::get().uri("/api/users?search=jack").insert_header(bearer(&admin)));
  assert_eq!(body["count"], 1);
  assert_eq!(body["data"][0]["username"], "jack");

  let (_, body) = call!(app, TestRequest::get().uri("/api/users").insert_header(bearer(&admin)));
  assert_eq!(body["count"], 3);

  let admin_account = state.stores.accounts.find_by_username(ADMIN_USERNAME).await.unwrap().unwrap();
  let (status, body) = call!(
    app,
    TestRequest::delete()
      .uri(&format!("/api/users/{}", admin_account.id))
      .insert_header(bearer(&admin))
  );
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["message"], "Admin accounts cannot be deleted");

  let jack_uri = format!("/api/users/{}", jack.id);
  let (status, _) = call!(app, TestRequest::delete().uri(&jack_uri).insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call!(app, TestRequest::get().uri(&jack_uri).insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::NOT_FOUND);

  // The order survives without an owner, and the old token no longer works.
  let (status, body) = call!(app, TestRequest::get().uri(&order_uri).insert_header(bearer(&admin)));
  assert_eq!(status, StatusCode::OK);
  assert!(body["data"]["user_id"].is_null());
  let (status, _) = call!(app, TestRequest::get().uri("/api/auth/me").insert_header(bearer(&jack_token)));
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_customer_cancels_only_queued_orders() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let admin = admin_token(&state).await;
  let (_, token) = customer(&state, "liam", "Liam Neeson").await;
  let service = service_named(&state, "Bed Cover").await;

  let mut ids = Vec::new();
  for _ in 0..2 {
    let (status, body) = call!(
      app,
      TestRequest::post()
        .uri("/api/orders")
        .insert_header(bearer(&token))
        .set_json(json!({
          "customer_name": "Liam Neeson",
          "phone_number": "0855555555",
          "items": [{"service_id": service.id, "quantity": 1}]
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    ids.push(body["data"]["id"].as_i64().unwrap());
  }

  let (status, body) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/orders/{}/cancel", ids[0]))
      .insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["data"]["status"], "cancelled");

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/orders/{}/cancel", ids[0]))
      .insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/orders/{}/status", ids[1]))
      .insert_header(bearer(&admin))
      .set_json(json!({"status": "drying"}))
  );
  assert_eq!(status, StatusCode::OK);
  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri(&format!("/api/orders/{}/cancel", ids[1]))
      .insert_header(bearer(&token))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (_, body) = call!(
    app,
    TestRequest::get().uri("/api/orders?status=cancelled").insert_header(bearer(&admin))
  );
  assert_eq!(body["count"], 1);
  let (status, _) = call!(
    app,
    TestRequest::get().uri("/api/orders?status=lost").insert_header(bearer(&admin))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_order_validation_errors() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let (_, token) = customer(&state, "mia", "Mia Wallace").await;
  let admin = admin_token(&state).await;

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .set_json(json!({"customer_name": "Mia Wallace", "phone_number": "0866666666", "items": []}))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call!(
    app,
    TestRequest::post()
      .uri("/api/orders")
      .insert_header(bearer(&token))
      .insert_header(("Content-Type", "application/json"))
      .set_payload("{not json")
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["success"], false);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/orders/1/status")
      .insert_header(bearer(&admin))
      .set_json(json!({"status": "folded"}))
  );
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = call!(
    app,
    TestRequest::put()
      .uri("/api/orders/424242/status")
      .insert_header(bearer(&admin))
      .set_json(json!({"status": "washing"}))
  );
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_health_and_unknown_routes() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);

  let (status, body) = call!(app, TestRequest::get().uri("/api/health"));
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);
  assert!(body["timestamp"].is_string());

  let (status, body) = call!(app, TestRequest::get().uri("/api/nothing-here"));
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body, json!({"success": false, "message": "Endpoint not found"}));
}

#[actix_web::test]
async fn test_profile_update_changes_password() {
  let state = seeded_state(None).await;
  let app = spawn_app!(state);
  let (_, token) = customer(&state, "nina", "Nina Simone").await;

  let (status, body) = call!(
    app,
    TestRequest::put().uri("/api/auth/profile").insert_header(bearer(&token)).set_json(json!({
      "full_name": "Nina S.",
      "phone_number": "0877777777",
      "new_password": "brand-new"
    }))
  );
  assert_eq!(status, StatusCode::OK, "{}", body);
  assert_eq!(body["data"]["full_name"], "Nina S.");

  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({"username": "nina", "password": CUSTOMER_PASSWORD}))
  );
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  let (status, _) = call!(
    app,
    TestRequest::post()
      .uri("/api/auth/login")
      .set_json(json!({"username": "nina", "password": "brand-new"}))
  );
  assert_eq!(status, StatusCode::OK);
}
