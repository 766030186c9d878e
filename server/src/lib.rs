// server/src/lib.rs

//! Mory Laundry backend: accounts, the service catalog, laundry orders,
//! dashboard statistics and an admin chat assistant, served over a JSON API.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod web;
