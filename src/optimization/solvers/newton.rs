use super::traits::{IterationObserver, Problem, Solver};
use crate::linalg;
use crate::optimization::record::{format_fixed, format_point, iterate, Limits, RunRecorder, Step};
use crate::types::{Method, OptimizationResult, TerminationReason};
use tracing::warn;

/// Newton's method with a unit step: `x <- x - H(x)^-1 * grad f(x)`.
pub struct NewtonOptimizer {
    max_iter: u32,
    precision: f64,
}

impl NewtonOptimizer {
    pub fn new(max_iter: u32, precision: f64) -> Self {
        Self {
            max_iter,
            precision,
        }
    }
}

impl Solver for NewtonOptimizer {
    fn method(&self) -> Method {
        Method::Newton
    }

    fn solve(
        &self,
        problem: &dyn Problem,
        observer: &mut dyn IterationObserver,
    ) -> OptimizationResult {
        // Symbolic Hessian is built once, before the loop
        if let Err(e) = problem.prepare_hessian() {
            let note = format!("Hessian construction failed: {}.", e);
            warn!(method = "newton", "{}", note);
            return RunRecorder::new(self.method(), problem.initial_point(), problem.primal_count())
                .finish(TerminationReason::EvaluationFailed, note);
        }

        let limits = Limits {
            max_iterations: self.max_iter,
            tolerance: self.precision,
        };

        iterate(self.method(), problem, observer, limits, |iter, x| {
            let evaluated = problem
                .gradient(x)
                .and_then(|g| problem.hessian(x).map(|h| (g, h)));
            let (gradient, hessian) = match evaluated {
                Ok(pair) => pair,
                Err(e) => {
                    return Step::Halt {
                        termination: TerminationReason::EvaluationFailed,
                        note: format!("Evaluation failed at step {}: {}.", iter, e),
                    };
                }
            };

            let Some(inverse) = linalg::invert(&hessian) else {
                return Step::Halt {
                    termination: TerminationReason::SingularHessian,
                    note: format!("Matrix inversion failed at step {}.", iter),
                };
            };

            let delta = linalg::multiply(&inverse, &gradient);
            let next: Vec<f64> = x.iter().zip(&delta).map(|(xi, di)| xi - di).collect();

            let explanation = format!(
                "Step {}: x = {}, ∇f = {}, Hessian inverse × ∇f = Δ = {}, x_new = x - Δ = {}.",
                iter,
                format_point(x),
                format_fixed(&gradient),
                format_fixed(&delta),
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
    use crate::optimization::callback::NoopObserver;
    use crate::optimization::problem::SymbolicProblem;

    fn problem(src: &str, vars: &[&str], start: &[f64]) -> SymbolicProblem {
        SymbolicProblem::new(
            Expression::parse(src).unwrap(),
            vars.iter().map(|v| v.to_string()).collect(),
            start.to_vec(),
        )
        .unwrap()
    }

    #[test]
    fn quadratic_is_solved_by_the_first_step() {
        let p = problem("(x - 1)^2 + (y - 1)^2", &["x", "y"], &[3.0, -2.0]);
        let result = NewtonOptimizer::new(100, 1e-6).solve(&p, &mut NoopObserver);

        assert_eq!(result.trajectory[1], vec![1.0, 1.0]);
        assert_eq!(result.termination, TerminationReason::Converged);
        assert_eq!(result.solution, vec![1.0, 1.0]);
        // the zero-length confirming step is recorded as well
        assert_eq!(result.iterations, 2);
    }

    #[test]
    fn singular_hessian_stops_at_start() {
        let p = problem("x^2 + y", &["x", "y"], &[1.0, 1.0]);
        let result = NewtonOptimizer::new(100, 1e-6).solve(&p, &mut NoopObserver);

        assert_eq!(result.termination, TerminationReason::SingularHessian);
        assert_eq!(result.trajectory, vec![vec![1.0, 1.0]]);
        assert_eq!(result.explanations, vec!["Matrix inversion failed at step 0."]);
    }

    #[test]
    fn explanation_reports_delta() {
        let p = problem("x^2", &["x"], &[2.0]);
        let result = NewtonOptimizer::new(1, 1e-6).solve(&p, &mut NoopObserver);
        assert_eq!(
            result.explanations[0],
            "Step 0: x = [2], ∇f = [4.0000], Hessian inverse × ∇f = Δ = [2.0000], \
             x_new = x - Δ = [0.0000]."
        );
    }
}
