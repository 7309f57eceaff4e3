mod gradient;
mod lagrangian;
mod newton;
pub mod traits;

pub use gradient::GradientDescent;
pub use lagrangian::LagrangianOptimizer;
pub use newton::NewtonOptimizer;
pub use traits::{IterationObserver, IterationSnapshot, Problem, Solver};

use crate::expression::Expression;
use crate::types::{Method, SelectionStrategy};

/// Pick a method for `objective`, with a human-readable reason.
pub fn select_method(
    objective: &Expression,
    has_constraints: bool,
    strategy: SelectionStrategy,
) -> (Method, String) {
    if has_constraints {
        return (
            Method::Lagrangian,
            "Auto: equality constraints present → Lagrangian".to_string(),
        );
    }

    match strategy {
        SelectionStrategy::Textual => {
            let text = objective.to_string();
            if text.contains("^2") && !text.contains("^3") && !text.contains("^4") {
                (
                    Method::Gradient,
                    format!("Auto: '{}' looks quadratic → Gradient Descent", text),
                )
            } else {
                (
                    Method::Newton,
                    format!("Auto: '{}' is not plainly quadratic → Newton", text),
                )
            }
        }
        SelectionStrategy::Degree => match objective.polynomial_degree() {
            Some(2) => (
                Method::Gradient,
                "Auto: polynomial of degree 2 → Gradient Descent".to_string(),
            ),
            Some(d) => (
                Method::Newton,
                format!("Auto: polynomial of degree {} → Newton", d),
            ),
            None => (
                Method::Newton,
                "Auto: non-polynomial objective → Newton".to_string(),
            ),
        },
    }
}

/// Concrete solver for `method`. Newton ignores `alpha`.
pub fn build_solver(method: Method, alpha: f64, max_iterations: u32, tolerance: f64) -> Box<dyn Solver> {
    match method {
        Method::Gradient => {
            Box::new(GradientDescent::new(max_iterations, tolerance).with_learning_rate(alpha))
        }
        Method::Newton => Box::new(NewtonOptimizer::new(max_iterations, tolerance)),
        Method::Lagrangian => {
            Box::new(LagrangianOptimizer::new(max_iterations, tolerance).with_learning_rate(alpha))
        }
    }
}
