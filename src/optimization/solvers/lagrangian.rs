use super::traits::{IterationObserver, Problem, Solver};
use crate::optimization::record::{format_fixed, format_point, iterate, Limits, Step};
use crate::types::{Method, OptimizationResult, TerminationReason};

/// First-order saddle-point search on the Lagrangian.
///
/// Expects a problem whose trailing variables are the multipliers (see
/// [`SymbolicProblem::lagrangian`](crate::optimization::SymbolicProblem::lagrangian)).
/// Primal coordinates descend along `dL/dx` while multipliers ascend along
/// `dL/dlambda`, which is the constraint residual. Convergence is measured
/// on the whole augmented step.
pub struct LagrangianOptimizer {
    max_iter: u32,
    precision: f64,
    alpha: f64,
}

impl LagrangianOptimizer {
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

impl Solver for LagrangianOptimizer {
    fn method(&self) -> Method {
        Method::Lagrangian
    }

    fn solve(
        &self,
        problem: &dyn Problem,
        observer: &mut dyn IterationObserver,
    ) -> OptimizationResult {
        let primal = problem.primal_count();
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
                .enumerate()
                .map(|(i, (xi, gi))| {
                    if i < primal {
                        xi - self.alpha * gi
                    } else {
                        xi + self.alpha * gi
                    }
                })
                .collect();

            let explanation = format!(
                "Step {}: x = {}, λ = {}, ∇L = {}, x_new = x - α * ∇ₓL, λ_new = λ + α * ∇λL = {}.",
                iter,
                format_point(&x[..primal]),
                format_point(&x[primal..]),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Expression;
    use crate::optimization::callback::{HistoryObserver, NoopObserver};
    use crate::optimization::problem::SymbolicProblem;
    use approx::assert_relative_eq;

    fn constrained(f: &str, g: &[&str], start: &[f64]) -> SymbolicProblem {
        let constraints: Vec<Expression> =
            g.iter().map(|src| Expression::parse(src).unwrap()).collect();
        SymbolicProblem::lagrangian(
            &Expression::parse(f).unwrap(),
            vec!["x".to_string(), "y".to_string()],
            &constraints,
            start.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn multipliers_ascend_on_constraint_residual() {
        // at (1, 1) the residual x + y - 1 is 1, so lambda grows from 1 to 1.1
        let p = constrained("x^2 + y^2", &["x + y - 1"], &[1.0, 1.0]);
        let mut history = HistoryObserver::default();
        LagrangianOptimizer::new(1, 1e-6).solve(&p, &mut history);

        let next = &history.records()[0].next;
        assert_relative_eq!(next[2], 1.1);
        assert_relative_eq!(next[0], 0.7);
    }

    #[test]
    fn finds_constrained_minimum_without_exposing_multipliers() {
        let p = constrained("x^2 + y^2", &["x + y - 1"], &[0.5, 0.5]);
        let result = LagrangianOptimizer::new(1000, 1e-6).solve(&p, &mut NoopObserver);

        assert!(result.converged());
        assert!(result.trajectory.iter().all(|pt| pt.len() == 2));
        assert_relative_eq!(result.solution[0], 0.5, epsilon = 1e-4);
        assert_relative_eq!(result.solution[1], 0.5, epsilon = 1e-4);
        assert!(result.explanations[0].starts_with("Step 0: x = [0.5, 0.5], λ = [1]"));
    }
}
