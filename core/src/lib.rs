// src/lib.rs

//! laundry-flow: a small async, type-safe step pipeline engine.
//!
//! A pipeline is an ordered list of named steps. Each step may carry
//! `before`, `on` and `after` handlers that operate on a shared
//! [`ContextData<T>`]. Steps can be optional or skipped by a condition, and any
//! handler can halt the run early with [`PipelineControl::Stop`].
//!
//! Pipelines are registered in a [`FlowRegistry`] keyed by their context data
//! type, so a caller only needs to build the context and call
//! `registry.run(ctx)`.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;

/// Wraps a plain closure into a [`SkipCondition`].
pub fn skip_when<T, F>(condition: F) -> SkipCondition<T>
where
  T: Send + Sync + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  std::sync::Arc::new(move |ctx: ContextData<T>| condition(&ctx.read()))
}
