// server/src/services/mod.rs

pub mod auth_service;
pub mod chat_context;
pub mod completion_client;
pub mod order_engine;
pub mod order_numbers;
pub mod token_service;
pub mod validation;
