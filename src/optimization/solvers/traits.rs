use crate::error::EvaluationError;
use crate::types::{Method, OptimizationResult};

/// Read-only view of one accepted iteration.
///
/// For the Lagrangian method `point`, `gradient` and `next` cover the
/// augmented variable set (originals followed by multipliers).
#[derive(Clone, Copy, Debug)]
pub struct IterationSnapshot<'a> {
    pub iteration: usize,
    pub method: Method,
    pub point: &'a [f64],
    pub gradient: &'a [f64],
    pub next: &'a [f64],
    pub displacement: f64,
}

/// Callback interface for optimization progress
pub trait IterationObserver {
    /// Called once per accepted step, before it is appended to the trajectory
    fn on_iteration(&mut self, snapshot: &IterationSnapshot<'_>);

    /// Checked at the top of every iteration
    fn should_stop(&self) -> bool {
        false
    }
}

/// Differentiable problem over an ordered variable set.
pub trait Problem {
    /// Variables indexing every point, including synthetic multipliers.
    fn variables(&self) -> &[String];

    /// Starting point over [`Problem::variables`].
    fn initial_point(&self) -> &[f64];

    /// Number of leading variables reported back to the caller.
    fn primal_count(&self) -> usize {
        self.variables().len()
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, EvaluationError>;

    /// Build the symbolic Hessian ahead of the first [`Problem::hessian`] call.
    fn prepare_hessian(&self) -> Result<(), EvaluationError> {
        Ok(())
    }

    fn hessian(&self, point: &[f64]) -> Result<Vec<Vec<f64>>, EvaluationError>;
}

/// Solver interface - takes problem and observer
pub trait Solver {
    fn method(&self) -> Method;

    fn name(&self) -> &str {
        self.method().display_name()
    }

    /// Run to completion. Failures inside the loop end the run early and are
    /// reported through [`OptimizationResult::termination`].
    fn solve(
        &self,
        problem: &dyn Problem,
        observer: &mut dyn IterationObserver,
    ) -> OptimizationResult;
}
