use super::traits::{IterationObserver, Problem, Solver};
use crate::optimization::record::{format_fixed, format_point, iterate, Limits, Step};
use crate::types::{Method, OptimizationResult, TerminationReason};

/// Fixed-step gradient descent: `x <- x - alpha * grad f(x)`.
pub struct GradientDescent {
    max_iter: u32,
    precision: f64,
    alpha: f64,
}

impl GradientDescent {
    pub fn new(max_iter: u32, precision: f64) -> Self {
        Self {
            max_iter,
            precision,
            alpha: 0.1,
        }
    }

    pub fn with_learning_rate(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }
}

impl Solver for GradientDescent {
    fn method(&self) -> Method {
        Method::Gradient
    }

    fn solve(
        &self,
        problem: &dyn Problem,
        observer: &mut dyn IterationObserver,
    ) -> OptimizationResult {
        let limits = Limits {
            max_iterations: self.max_iter,
            tolerance: self.precision,
        };

        iterate(self.method(), problem, observer, limits, |iter, x| {
            let gradient = match problem.gradient(x) {
                Ok(g) => g,
                Err(e) => {
                    return Step::Halt {
                        termination: TerminationReason::EvaluationFailed,
                        note: format!("Gradient evaluation failed at step {}: {}.", iter, e),
                    };
                }
            };

            let next: Vec<f64> = x
                .iter()
                .zip(&gradient)
                .map(|(xi, gi)| xi - self.alpha * gi)
                .collect();

            let explanation = format!(
                "Step {}: We start with x = {}. Using Gradient Descent, we compute gradients \
                 ∇f = {}, then update using x_new = x - α * ∇f = {}.",
                iter,
                format_point(x),
                format_fixed(&gradient),
                format_fixed(&next)
            );

            Step::Candidate {
                gradient,
                next,
                explanation,
            }
        })
    }
}
