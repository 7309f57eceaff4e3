use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use symopt::optimization::{
    GradientDescent, HistoryObserver, NewtonOptimizer, NoopObserver, Problem, Solver,
};
use symopt::{EvaluationError, TerminationReason};

// ============================================================
// Test objectives
// ============================================================

/// f(x) = 0.5 * sum(x_i^2). Minimum at origin.
struct Quadratic {
    vars: Vec<String>,
    start: Vec<f64>,
}

impl Quadratic {
    fn new(start: &[f64]) -> Self {
        Self {
            vars: (0..start.len()).map(|i| format!("x{}", i)).collect(),
            start: start.to_vec(),
        }
    }
}

impl Problem for Quadratic {
    fn variables(&self) -> &[String] {
        &self.vars
    }

    fn initial_point(&self) -> &[f64] {
        &self.start
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        Ok(point.to_vec())
    }

    fn hessian(&self, point: &[f64]) -> Result<Vec<Vec<f64>>, EvaluationError> {
        let n = point.len();
        Ok((0..n)
            .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
            .collect())
    }
}

/// Constant slope 10 whose gradient fails once x drops below zero.
/// The Hessian is identically zero.
struct FailsBelowZero {
    vars: Vec<String>,
}

impl FailsBelowZero {
    fn new() -> Self {
        Self {
            vars: vec!["x".to_string()],
        }
    }
}

impl Problem for FailsBelowZero {
    fn variables(&self) -> &[String] {
        &self.vars
    }

    fn initial_point(&self) -> &[f64] {
        &[1.0]
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        if point[0] < 0.0 {
            return Err(EvaluationError::NonFinite {
                expression: "sqrt(x)".into(),
                value: f64::NAN,
            });
        }
        Ok(vec![10.0])
    }

    fn hessian(&self, _point: &[f64]) -> Result<Vec<Vec<f64>>, EvaluationError> {
        Ok(vec![vec![0.0]])
    }
}

// ============================================================
// Gradient descent
// ============================================================

#[test]
fn gradient_descent_contracts_toward_origin() {
    let p = Quadratic::new(&[1.0, -2.0, 0.5]);
    let result = GradientDescent::new(500, 1e-8)
        .with_learning_rate(0.5)
        .solve(&p, &mut NoopObserver);

    assert_eq!(result.termination, TerminationReason::Converged);
    for x in &result.solution {
        assert_relative_eq!(*x, 0.0, epsilon = 1e-7);
    }
    // each step halves the point
    assert_relative_eq!(result.trajectory[1][1], -1.0);
}

#[test]
fn iteration_budget_bounds_trajectory() {
    let p = Quadratic::new(&[100.0]);
    let result = GradientDescent::new(5, 1e-12)
        .with_learning_rate(0.01)
        .solve(&p, &mut NoopObserver);

    assert_eq!(result.termination, TerminationReason::MaxIterations);
    assert_eq!(result.trajectory.len(), 6);
    assert_eq!(result.iterations, 5);
    assert_eq!(result.explanations.len(), 6);
    assert!(result.explanations[5].contains("maximum of 5 iterations"));
}

#[test]
fn failure_midway_keeps_accepted_steps() {
    // 1.0 -> 0.0 -> -1.0, then the gradient fails
    let result = GradientDescent::new(100, 1e-6)
        .with_learning_rate(0.1)
        .solve(&FailsBelowZero::new(), &mut NoopObserver);

    assert_eq!(result.termination, TerminationReason::EvaluationFailed);
    assert_eq!(result.trajectory, vec![vec![1.0], vec![0.0], vec![-1.0]]);
    assert_eq!(result.solution, vec![-1.0]);
    assert_eq!(result.explanations.len(), 3);
    assert!(result.explanations[2].starts_with("Gradient evaluation failed at step 2"));
}

// ============================================================
// Newton
// ============================================================

#[test]
fn newton_is_exact_on_quadratics_from_random_starts() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..20 {
        let start: Vec<f64> = (0..3).map(|_| rng.gen_range(-50.0..50.0)).collect();
        let result = NewtonOptimizer::new(10, 1e-9).solve(&Quadratic::new(&start), &mut NoopObserver);

        assert_eq!(result.termination, TerminationReason::Converged);
        assert_eq!(result.trajectory[1], vec![0.0, 0.0, 0.0]);
        assert_eq!(result.trajectory.len(), 3);
    }
}

#[test]
fn newton_observer_sees_every_accepted_step() {
    let mut history = HistoryObserver::default();
    let result = NewtonOptimizer::new(10, 1e-9).solve(&Quadratic::new(&[4.0, 2.0]), &mut history);

    let records = history.records();
    assert_eq!(records.len(), result.iterations);
    assert_eq!(records[0].point, vec![4.0, 2.0]);
    assert_eq!(records[0].gradient, vec![4.0, 2.0]);
    assert_relative_eq!(records[0].displacement, 20f64.sqrt());
    assert_eq!(records[1].displacement, 0.0);
}

#[test]
fn newton_singular_hessian_is_reported() {
    let result = NewtonOptimizer::new(10, 1e-6).solve(&FailsBelowZero::new(), &mut NoopObserver);

    assert_eq!(result.termination, TerminationReason::SingularHessian);
    assert_eq!(result.trajectory, vec![vec![1.0]]);
    assert_eq!(result.iterations, 0);
}
