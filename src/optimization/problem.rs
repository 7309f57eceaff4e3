use crate::error::EvaluationError;
use crate::expression::{CompiledExpression, Expr, Expression};
use crate::optimization::solvers::traits::Problem;
use std::cell::OnceCell;

/// Starting value for every Lagrange multiplier.
pub const MULTIPLIER_START: f64 = 1.0;

/// Problem backed by a symbolic objective.
///
/// The gradient is differentiated and compiled once at construction. The
/// Hessian is only needed by Newton, so it is built on first use and then
/// kept for the rest of the run.
pub struct SymbolicProblem {
    objective: Expression,
    variables: Vec<String>,
    primal_count: usize,
    initial: Vec<f64>,
    gradient: Vec<CompiledExpression>,
    hessian: OnceCell<Vec<Vec<CompiledExpression>>>,
}

impl SymbolicProblem {
    /// Unconstrained problem over `variables`.
    pub fn new(
        objective: Expression,
        variables: Vec<String>,
        initial_point: Vec<f64>,
    ) -> Result<Self, EvaluationError> {
        let primal_count = variables.len();
        Self::build(objective, variables, primal_count, initial_point)
    }

    /// Equality-constrained problem, rewritten as the Lagrangian
    /// `L = f + sum(lambda_i * g_i)` over `variables ++ multipliers`.
    ///
    /// Multipliers start at [`MULTIPLIER_START`]; only the original
    /// variables are reported back through [`Problem::primal_count`].
    pub fn lagrangian(
        objective: &Expression,
        variables: Vec<String>,
        constraints: &[Expression],
        initial_point: Vec<f64>,
    ) -> Result<Self, EvaluationError> {
        let multipliers = multiplier_names(&variables, constraints.len());

        let terms = std::iter::once(objective.tree().clone()).chain(
            constraints
                .iter()
                .zip(&multipliers)
                .map(|(g, lambda)| Expr::mul(Expr::var(lambda), g.tree().clone())),
        );
        let tree = balanced_sum(terms.collect());

        let primal_count = variables.len();
        let mut augmented = variables;
        augmented.extend(multipliers);

        let mut start = initial_point;
        start.resize(start.len() + constraints.len(), MULTIPLIER_START);

        Self::build(Expression::from_tree(tree), augmented, primal_count, start)
    }

    fn build(
        objective: Expression,
        variables: Vec<String>,
        primal_count: usize,
        initial: Vec<f64>,
    ) -> Result<Self, EvaluationError> {
        if initial.len() != variables.len() {
            return Err(EvaluationError::ArityMismatch {
                expected: variables.len(),
                found: initial.len(),
            });
        }

        // Compiling the objective surfaces unbound identifiers even when a
        // partial derivative happens to drop them.
        objective.compile(&variables)?;

        let gradient = objective
            .gradient(&variables)
            .iter()
            .map(|partial| partial.compile(&variables))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            objective,
            variables,
            primal_count,
            initial,
            gradient,
            hessian: OnceCell::new(),
        })
    }

    /// Synthetic multiplier names, empty for unconstrained problems.
    pub fn multipliers(&self) -> &[String] {
        &self.variables[self.primal_count..]
    }

    fn compiled_hessian(&self) -> Result<&[Vec<CompiledExpression>], EvaluationError> {
        if let Some(h) = self.hessian.get() {
            return Ok(h);
        }

        let rows = self
            .objective
            .hessian(&self.variables)
            .iter()
            .map(|row| {
                row.iter()
                    .map(|entry| entry.compile(&self.variables))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.hessian.get_or_init(|| rows))
    }
}

impl Problem for SymbolicProblem {
    fn variables(&self) -> &[String] {
        &self.variables
    }

    fn initial_point(&self) -> &[f64] {
        &self.initial
    }

    fn primal_count(&self) -> usize {
        self.primal_count
    }

    fn gradient(&self, point: &[f64]) -> Result<Vec<f64>, EvaluationError> {
        self.gradient.iter().map(|g| g.evaluate(point)).collect()
    }

    fn prepare_hessian(&self) -> Result<(), EvaluationError> {
        self.compiled_hessian().map(|_| ())
    }

    fn hessian(&self, point: &[f64]) -> Result<Vec<Vec<f64>>, EvaluationError> {
        self.compiled_hessian()?
            .iter()
            .map(|row| {
                row.iter()
                    .map(|h| h.evaluate(point))
                    .collect::<Result<Vec<f64>, _>>()
            })
            .collect()
    }
}

/// Pairwise sum, so the tree height grows with the log of the term count.
fn balanced_sum(mut terms: Vec<Expr>) -> Expr {
    while terms.len() > 1 {
        let mut paired = Vec::with_capacity(terms.len().div_ceil(2));
        let mut rest = terms.into_iter();
        while let Some(a) = rest.next() {
            paired.push(match rest.next() {
                Some(b) => Expr::add(a, b),
                None => a,
            });
        }
        terms = paired;
    }
    terms.pop().unwrap_or(Expr::Const(0.0))
}

/// `lambda0`, `lambda1`, ... with `_` appended until no user variable clashes.
pub fn multiplier_names(variables: &[String], count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let mut name = format!("lambda{}", i);
            while variables.contains(&name) {
                name.push('_');
            }
            name
        })
        .collect()
}
