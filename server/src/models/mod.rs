// server/src/models/mod.rs

//! Domain types shared by the storage backends, the pipelines and the HTTP layer.

pub mod account;
pub mod order;
pub mod report;
pub mod service;

pub use account::{Account, NewAccount, ProfileUpdate, Role};
pub use order::{
  NewOrder, NewOrderLine, Order, OrderFilter, OrderItemInput, OrderLine, OrderStatus, OrderWithLines, MONEY_SCALE,
};
pub use report::{
  AccountCounts, CustomerStats, DashboardStats, OrderStats, PopularService, StatusCount, TimeWindow, TopCustomer,
  WindowStats,
};
pub use service::{Service, ServiceDraft, ServiceUnit};
