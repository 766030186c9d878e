// core/src/core/control.rs

//! Flow signals returned by handlers and the outcome of a whole run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  /// Keep going with the next handler / step.
  Continue,
  /// Halt the run right here. Nothing after this handler executes.
  Stop,
}

/// Outcome of [`Pipeline::run`](crate::Pipeline::run) when no handler failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  Completed,
  Stopped,
}
