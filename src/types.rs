use crate::error::{OptResult, OptimizeError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ===== ENUMS =====

/// Concrete solver family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Gradient,
    Newton,
    Lagrangian,
}

impl Method {
    /// Short identifier accepted by the driver (`"gradient"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gradient => "gradient",
            Self::Newton => "newton",
            Self::Lagrangian => "lagrangian",
        }
    }

    /// Name reported in results.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Gradient => "Gradient Descent",
            Self::Newton => "Newton",
            Self::Lagrangian => "Lagrangian",
        }
    }

    /// Parse a requested method; `"auto"` maps to `None`.
    ///
    /// Names are matched exactly, so `"Newton"` or `" newton"` are rejected.
    pub fn parse_request(name: &str) -> OptResult<Option<Method>> {
        match name {
            "auto" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl FromStr for Method {
    type Err = OptimizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gradient" => Ok(Self::Gradient),
            "newton" => Ok(Self::Newton),
            "lagrangian" => Ok(Self::Lagrangian),
            _ => Err(OptimizeError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// How the selector decides between gradient descent and Newton.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Substring test on the printed objective (`^2` but no `^3`/`^4`).
    #[default]
    Textual,
    /// Polynomial degree of the parsed objective.
    Degree,
}

/// Why a solver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    /// Step displacement fell below tolerance.
    Converged,
    /// Iteration budget exhausted.
    MaxIterations,
    /// Hessian could not be inverted.
    SingularHessian,
    /// A gradient or Hessian entry was non-finite or unbound.
    EvaluationFailed,
    /// The candidate step was not finite.
    Diverged,
    /// An observer or cancellation token asked to stop.
    Stopped,
}

impl TerminationReason {
    /// Whether the run converged.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Converged)
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Converged => write!(f, "converged"),
            Self::MaxIterations => write!(f, "maximum iterations reached"),
            Self::SingularHessian => write!(f, "singular Hessian"),
            Self::EvaluationFailed => write!(f, "evaluation failed"),
            Self::Diverged => write!(f, "diverged"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

// ===== RESULTS =====

/// Outcome of one solver invocation.
///
/// `solution` and every `trajectory` entry are restricted to the caller's
/// variables; Lagrange multipliers never appear here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub method: String,
    pub solution: Vec<f64>,
    pub trajectory: Vec<Vec<f64>>,
    pub explanations: Vec<String>,
    pub iterations: usize,
    pub termination: TerminationReason,
}

impl OptimizationResult {
    pub fn converged(&self) -> bool {
        self.termination.is_success()
    }

    pub fn to_json(&self) -> OptResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ===== REQUESTS =====

fn default_alpha() -> f64 {
    0.1
}

fn default_max_iterations() -> u32 {
    100
}

fn default_tolerance() -> f64 {
    1e-6
}

fn default_method() -> String {
    "auto".to_string()
}

/// Serializable solve request, as sent by a front end.
///
/// ```json
/// { "expression": "(x - 2)^2 + (y - 3)^2", "initialPoint": [0, 0] }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveRequest {
    pub expression: String,
    /// Defaults to the sorted variables of the objective.
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    pub initial_point: Vec<f64>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub selection: SelectionStrategy,
    /// Treat `expression` and `constraints` as LaTeX markup.
    #[serde(default)]
    pub latex: bool,
}

impl SolveRequest {
    pub fn new(expression: impl Into<String>, initial_point: Vec<f64>) -> Self {
        Self {
            expression: expression.into(),
            variables: None,
            initial_point,
            constraints: Vec::new(),
            alpha: default_alpha(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            method: default_method(),
            selection: SelectionStrategy::default(),
            latex: false,
        }
    }

    pub fn from_json(json: &str) -> OptResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
