//! Symbolic expressions: parsing, differentiation, evaluation.

mod ast;
mod compiled;
mod derivative;
pub mod latex;
mod parser;

pub use ast::{Expr, Func};
pub use compiled::CompiledExpression;
pub use latex::latex_to_expression;

use crate::error::{EvaluationError, ParseError};
use indexmap::IndexMap;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Immutable symbolic scalar function of named variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    tree: Expr,
}

impl Expression {
    /// Parse canonical expression text such as `(x - 2)^2 + 3*y`.
    pub fn parse(src: &str) -> Result<Self, ParseError> {
        parser::parse(src).map(|tree| Self { tree })
    }

    /// Parse LaTeX markup (`\frac{x}{2} + y^{2}`).
    pub fn from_latex(latex: &str) -> Result<Self, ParseError> {
        Self::parse(&latex_to_expression(latex))
    }

    pub fn from_tree(tree: Expr) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Expr {
        &self.tree
    }

    /// Simplified partial derivative with respect to `var`.
    pub fn differentiate(&self, var: &str) -> Expression {
        Self {
            tree: derivative::differentiate(&self.tree, var).simplify(),
        }
    }

    /// One partial derivative per variable, in `vars` order.
    pub fn gradient<S: AsRef<str>>(&self, vars: &[S]) -> Vec<Expression> {
        vars.iter().map(|v| self.differentiate(v.as_ref())).collect()
    }

    /// Full `n x n` matrix of second partials, `H[i][j] = d2f / dx_i dx_j`.
    pub fn hessian<S: AsRef<str>>(&self, vars: &[S]) -> Vec<Vec<Expression>> {
        self.gradient(vars)
            .iter()
            .map(|partial| partial.gradient(vars))
            .collect()
    }

    /// Evaluate at a name -> value binding.
    pub fn evaluate(&self, binding: &IndexMap<String, f64>) -> Result<f64, EvaluationError> {
        let value = self
            .tree
            .eval_with(&|name: &str| binding.get(name).copied())
            .map_err(|name| EvaluationError::UnboundVariable { name })?;

        if !value.is_finite() {
            return Err(EvaluationError::NonFinite {
                expression: self.to_string(),
                value,
            });
        }
        Ok(value)
    }

    /// Lower into bytecode bound to `variables` by position.
    pub fn compile(&self, variables: &[String]) -> Result<CompiledExpression, EvaluationError> {
        CompiledExpression::compile(&self.tree, variables)
    }

    /// Distinct variable names, sorted.
    pub fn variables(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        self.tree.collect_variables(&mut names);
        names.into_iter().collect()
    }

    /// Polynomial degree, or `None` for non-polynomial expressions.
    pub fn polynomial_degree(&self) -> Option<u32> {
        self.tree.polynomial_degree()
    }
}

impl FromStr for Expression {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.tree, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_and_hessian_follow_variable_order() {
        let f = Expression::parse("x^2*y + y^3").unwrap();
        let grad: Vec<String> = f.gradient(&["y", "x"]).iter().map(|g| g.to_string()).collect();
        assert_eq!(grad, vec!["x^2 + 3*y^2", "2*x*y"]);

        let h = f.hessian(&["x", "y"]);
        assert_eq!(h.len(), 2);
        assert_eq!(h[0][0].to_string(), "2*y");
        assert_eq!(h[0][1].to_string(), "2*x");
        assert_eq!(h[1][0].to_string(), "2*x");
        assert_eq!(h[1][1].to_string(), "6*y");
    }

    #[test]
    fn evaluate_requires_complete_binding() {
        let f = Expression::parse("x + y").unwrap();
        let mut binding = IndexMap::new();
        binding.insert("x".to_string(), 1.0);
        assert_eq!(
            f.evaluate(&binding),
            Err(EvaluationError::UnboundVariable { name: "y".into() })
        );

        binding.insert("y".to_string(), 2.5);
        assert_eq!(f.evaluate(&binding), Ok(3.5));
    }

    #[test]
    fn evaluate_rejects_non_finite_results() {
        let f = Expression::parse("ln(x)").unwrap();
        let binding: IndexMap<String, f64> = [("x".to_string(), -1.0)].into_iter().collect();
        assert!(matches!(
            f.evaluate(&binding),
            Err(EvaluationError::NonFinite { .. })
        ));
    }

    #[test]
    fn printed_form_round_trips() {
        for src in [
            "(x - 2)^2 + (y - 3)^2",
            "-x^2 + 2*x*y - y/(1 + x^2)",
            "exp(-x)*sin(3*y) - sqrt(x^2 + 1)",
            "x^-1 + 2^x^2",
        ] {
            let f = Expression::parse(src).unwrap();
            let again = Expression::parse(&f.to_string()).unwrap();
            let binding: IndexMap<String, f64> =
                [("x".to_string(), 0.8), ("y".to_string(), -1.7)].into_iter().collect();
            assert_eq!(f.evaluate(&binding), again.evaluate(&binding), "{}", src);
        }
    }

    #[test]
    fn variables_are_sorted_and_unique() {
        let f = Expression::parse("y*x + x^2 + z - pi").unwrap();
        assert_eq!(f.variables(), vec!["x", "y", "z"]);
    }

    #[test]
    fn latex_input_parses() {
        let f = Expression::from_latex(r"\frac{x^{2}}{2} + \left(y-1\right)^{2}").unwrap();
        let binding: IndexMap<String, f64> =
            [("x".to_string(), 2.0), ("y".to_string(), 3.0)].into_iter().collect();
        assert_eq!(f.evaluate(&binding), Ok(6.0));
    }
}
