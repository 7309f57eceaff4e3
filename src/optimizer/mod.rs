//! Input validation and dispatch.

use crate::error::{OptResult, OptimizeError};
use crate::expression::{latex_to_expression, Expression};
use crate::optimization::{
    build_solver, select_method, IterationObserver, NoopObserver, SymbolicProblem,
};
use crate::types::{Method, OptimizationResult, SelectionStrategy, SolveRequest};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::{info, warn};

/// Solver configuration shared by any number of `solve` calls.
#[derive(Clone, Debug, PartialEq)]
pub struct Optimizer {
    /// `"auto"`, `"gradient"`, `"newton"` or `"lagrangian"`.
    pub method: String,
    pub alpha: f64,
    pub max_iterations: u32,
    pub tolerance: f64,
    pub selection: SelectionStrategy,
}

impl Default for Optimizer {
    fn default() -> Self {
        Self {
            method: "auto".to_string(),
            alpha: 0.1,
            max_iterations: 100,
            tolerance: 1e-6,
            selection: SelectionStrategy::Textual,
        }
    }
}

impl Optimizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_selection(mut self, selection: SelectionStrategy) -> Self {
        self.selection = selection;
        self
    }

    pub fn solve<V, C>(
        &self,
        expression: &str,
        variables: &[V],
        initial_point: &[f64],
        constraints: &[C],
    ) -> OptResult<OptimizationResult>
    where
        V: AsRef<str>,
        C: AsRef<str>,
    {
        self.solve_with_observer(expression, variables, initial_point, constraints, &mut NoopObserver)
    }

    /// Validate, pick a method, and run exactly one solver.
    ///
    /// Every error is raised before the first iteration. Failures inside the
    /// loop are reported through the result's termination reason instead.
    pub fn solve_with_observer<V, C>(
        &self,
        expression: &str,
        variables: &[V],
        initial_point: &[f64],
        constraints: &[C],
        observer: &mut dyn IterationObserver,
    ) -> OptResult<OptimizationResult>
    where
        V: AsRef<str>,
        C: AsRef<str>,
    {
        let requested = Method::parse_request(&self.method)?;
        self.check_numeric()?;
        let variables = check_variables(variables)?;

        if initial_point.len() != variables.len() {
            return Err(OptimizeError::DimensionMismatch {
                expected: variables.len(),
                found: initial_point.len(),
            });
        }

        let objective =
            Expression::parse(expression).map_err(|e| OptimizeError::parse(expression, e))?;
        let constraints = constraints
            .iter()
            .map(|c| {
                let src = c.as_ref();
                Expression::parse(src).map_err(|e| OptimizeError::parse(src, e))
            })
            .collect::<OptResult<Vec<_>>>()?;

        let (method, reason) = match requested {
            Some(method) => (method, format!("Requested: {}", method)),
            None => select_method(&objective, !constraints.is_empty(), self.selection),
        };

        if method != Method::Lagrangian && !constraints.is_empty() {
            warn!(method = method.as_str(), count = constraints.len(), "constraints ignored");
        }

        let problem = match method {
            Method::Lagrangian => SymbolicProblem::lagrangian(
                &objective,
                variables,
                &constraints,
                initial_point.to_vec(),
            )?,
            _ => SymbolicProblem::new(objective, variables, initial_point.to_vec())?,
        };

        info!(method = method.as_str(), %reason, "dispatching");

        let solver = build_solver(method, self.alpha, self.max_iterations, self.tolerance);
        let result = solver.solve(&problem, observer);

        info!(
            method = solver.name(),
            iterations = result.iterations,
            termination = %result.termination,
            "finished"
        );
        Ok(result)
    }

    fn check_numeric(&self) -> OptResult<()> {
        if !(self.alpha.is_finite() && self.alpha > 0.0) {
            return Err(OptimizeError::InvalidAlpha(self.alpha));
        }
        if self.max_iterations == 0 {
            return Err(OptimizeError::InvalidMaxIterations);
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(OptimizeError::InvalidTolerance(self.tolerance));
        }
        Ok(())
    }
}

fn check_variables<V: AsRef<str>>(variables: &[V]) -> OptResult<Vec<String>> {
    if variables.is_empty() {
        return Err(OptimizeError::NoVariables);
    }

    let mut seen = HashSet::with_capacity(variables.len());
    for v in variables {
        if !seen.insert(v.as_ref()) {
            return Err(OptimizeError::DuplicateVariable(v.as_ref().to_string()));
        }
    }

    Ok(variables.iter().map(|v| v.as_ref().to_string()).collect())
}

/// One-shot solve with explicit parameters.
///
/// ```
/// let result = symopt::solve(
///     "(x - 2)^2 + (y - 3)^2",
///     &["x", "y"],
///     &[0.0, 0.0],
///     &[],
///     0.1,
///     100,
///     1e-6,
///     "auto",
/// )
/// .unwrap();
/// assert_eq!(result.method, "Gradient Descent");
/// ```
#[allow(clippy::too_many_arguments)]
pub fn solve(
    expression: &str,
    variables: &[&str],
    initial_point: &[f64],
    constraints: &[&str],
    alpha: f64,
    max_iterations: u32,
    tolerance: f64,
    method: &str,
) -> OptResult<OptimizationResult> {
    Optimizer::new()
        .with_method(method)
        .with_alpha(alpha)
        .with_max_iterations(max_iterations)
        .with_tolerance(tolerance)
        .solve(expression, variables, initial_point, constraints)
}

impl SolveRequest {
    pub fn optimizer(&self) -> Optimizer {
        Optimizer {
            method: self.method.clone(),
            alpha: self.alpha,
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            selection: self.selection,
        }
    }

    pub fn run(&self) -> OptResult<OptimizationResult> {
        self.run_with_observer(&mut NoopObserver)
    }

    pub fn run_with_observer(
        &self,
        observer: &mut dyn IterationObserver,
    ) -> OptResult<OptimizationResult> {
        // Method names are rejected before anything is parsed
        Method::parse_request(&self.method)?;

        let (expression, constraints) = if self.latex {
            (
                latex_to_expression(&self.expression),
                self.constraints.iter().map(|c| latex_to_expression(c)).collect(),
            )
        } else {
            (self.expression.clone(), self.constraints.clone())
        };

        let variables = match &self.variables {
            Some(vars) => vars.clone(),
            None => Expression::parse(&expression)
                .map_err(|e| OptimizeError::parse(&expression, e))?
                .variables(),
        };

        self.optimizer().solve_with_observer(
            &expression,
            &variables,
            &self.initial_point,
            &constraints,
            observer,
        )
    }
}

/// Run independent requests in parallel; outcomes keep the input order.
pub fn solve_batch(requests: &[SolveRequest]) -> Vec<OptResult<OptimizationResult>> {
    requests.par_iter().map(SolveRequest::run).collect()
}
