use crate::optimizer::Optimizer;
use crate::types;
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

#[pyclass(name = "OptimizationResult", frozen)]
#[derive(Clone, Debug)]
pub struct PyOptimizationResult {
    #[pyo3(get)]
    pub method: String,
    #[pyo3(get)]
    pub solution: Vec<f64>,
    #[pyo3(get)]
    pub trajectory: Vec<Vec<f64>>,
    #[pyo3(get)]
    pub explanations: Vec<String>,
    #[pyo3(get)]
    pub iterations: usize,
    #[pyo3(get)]
    pub termination: String,
    #[pyo3(get)]
    pub converged: bool,
}

impl From<types::OptimizationResult> for PyOptimizationResult {
    fn from(r: types::OptimizationResult) -> Self {
        Self {
            converged: r.converged(),
            termination: r.termination.to_string(),
            method: r.method,
            solution: r.solution,
            trajectory: r.trajectory,
            explanations: r.explanations,
            iterations: r.iterations,
        }
    }
}

#[pymethods]
impl PyOptimizationResult {
    fn __repr__(&self) -> String {
        format!(
            "OptimizationResult(method='{}', solution={:?}, iterations={}, termination='{}')",
            self.method, self.solution, self.iterations, self.termination
        )
    }
}

#[pyfunction]
#[pyo3(signature = (expression, variables, initial_point, constraints=Vec::new(), alpha=0.1, max_iterations=100, tolerance=1e-6, method="auto".to_string()))]
#[allow(clippy::too_many_arguments)]
fn solve(
    py: Python<'_>,
    expression: String,
    variables: Vec<String>,
    initial_point: Vec<f64>,
    constraints: Vec<String>,
    alpha: f64,
    max_iterations: u32,
    tolerance: f64,
    method: String,
) -> PyResult<PyOptimizationResult> {
    let optimizer = Optimizer::new()
        .with_method(method)
        .with_alpha(alpha)
        .with_max_iterations(max_iterations)
        .with_tolerance(tolerance);

    py.allow_threads(|| optimizer.solve(&expression, &variables, &initial_point, &constraints))
        .map(PyOptimizationResult::from)
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pyfunction]
fn latex_to_expression(latex: &str) -> String {
    crate::expression::latex_to_expression(latex)
}

#[pymodule]
fn symopt(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyOptimizationResult>()?;
    m.add_function(wrap_pyfunction!(solve, m)?)?;
    m.add_function(wrap_pyfunction!(latex_to_expression, m)?)?;
    Ok(())
}
