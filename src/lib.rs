//! Symbolic optimization engine.
//!
//! Objectives and equality constraints are given as expression text; the
//! crate differentiates them symbolically and runs gradient descent,
//! Newton's method or a Lagrangian saddle-point search, returning the
//! solution together with the full trajectory and a per-step explanation.

pub mod error;
pub mod expression;
pub mod linalg;
pub mod optimization;
mod optimizer;
#[cfg(feature = "python")]
mod python;
pub mod types;

pub use error::{EvaluationError, OptResult, OptimizeError, ParseError};
pub use expression::{latex_to_expression, Expression};
pub use optimization::{
    CancelToken, Cancellable, ChannelObserver, HistoryObserver, IterationObserver, IterationRecord,
    IterationSnapshot, NoopObserver,
};
pub use optimizer::{solve, solve_batch, Optimizer};
pub use types::{Method, OptimizationResult, SelectionStrategy, SolveRequest, TerminationReason};
