/// Euclidean distance between two points of equal length.
pub fn displacement(prev: &[f64], next: &[f64]) -> f64 {
    debug_assert_eq!(prev.len(), next.len());
    prev.iter()
        .zip(next)
        .map(|(p, n)| (n - p) * (n - p))
        .sum::<f64>()
        .sqrt()
}

/// True when the step from `prev` to `next` is shorter than `tol`.
pub fn has_converged(prev: &[f64], next: &[f64], tol: f64) -> bool {
    displacement(prev, next) < tol
}
