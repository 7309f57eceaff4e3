//! Dense linear algebra for the Newton step.

/// Pivots smaller than this are treated as zero.
const SINGULAR_EPS: f64 = 1e-12;

/// LU factorization with partial pivoting.
///
/// L is stored below the diagonal (unit diagonal implicit), U on and above.
pub struct LuFactors {
    lu: Vec<Vec<f64>>,
    /// `perm[i]` is the original row index of factored row `i`.
    perm: Vec<usize>,
    n: usize,
}

/// Factorize a square matrix. Returns `None` if it is singular, not square,
/// or contains non-finite entries.
// Explicit indexing reads better for pivot search and elimination
#[allow(clippy::needless_range_loop)]
pub fn lu_factor(a: &[Vec<f64>]) -> Option<LuFactors> {
    let n = a.len();
    if a.iter().any(|row| row.len() != n || row.iter().any(|v| !v.is_finite())) {
        return None;
    }

    let mut lu = a.to_vec();
    let mut perm: Vec<usize> = (0..n).collect();

    for col in 0..n {
        let mut max_val = lu[col][col].abs();
        let mut max_row = col;
        for row in (col + 1)..n {
            let v = lu[row][col].abs();
            if v > max_val {
                max_val = v;
                max_row = row;
            }
        }

        if max_val < SINGULAR_EPS {
            return None;
        }

        if max_row != col {
            lu.swap(col, max_row);
            perm.swap(col, max_row);
        }

        let pivot = lu[col][col];
        for row in (col + 1)..n {
            let factor = lu[row][col] / pivot;
            lu[row][col] = factor;
            for j in (col + 1)..n {
                let val = lu[col][j];
                lu[row][j] -= factor * val;
            }
        }
    }

    Some(LuFactors { lu, perm, n })
}

/// Solve `A x = b` against existing factors.
#[allow(clippy::needless_range_loop)]
pub fn lu_back_solve(factors: &LuFactors, b: &[f64]) -> Vec<f64> {
    let n = factors.n;
    debug_assert_eq!(b.len(), n);

    let mut y: Vec<f64> = factors.perm.iter().map(|&p| b[p]).collect();

    // Forward substitution, unit lower triangle
    for i in 1..n {
        for j in 0..i {
            let l_ij = factors.lu[i][j];
            let y_j = y[j];
            y[i] -= l_ij * y_j;
        }
    }

    // Back substitution
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= factors.lu[i][j] * x[j];
        }
        x[i] = sum / factors.lu[i][i];
    }

    x
}

/// Matrix inverse, or `None` if `a` is singular.
pub fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let factors = lu_factor(a)?;
    let n = factors.n;

    // Solve for each unit column, then transpose columns into rows.
    let columns: Vec<Vec<f64>> = (0..n)
        .map(|j| {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            lu_back_solve(&factors, &e)
        })
        .collect();

    let inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect();

    if inverse.iter().flatten().all(|v| v.is_finite()) {
        Some(inverse)
    } else {
        None
    }
}

/// Matrix-vector product `a * v`.
pub fn multiply(a: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    a.iter()
        .map(|row| row.iter().zip(v).map(|(aij, vj)| aij * vj).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn inverts_identity() {
        let eye = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_eq!(invert(&eye).unwrap(), eye);
    }

    #[test]
    fn inverse_times_matrix_is_identity() {
        let a = vec![
            vec![4.0, -2.0, 1.0],
            vec![-2.0, 4.0, -2.0],
            vec![1.0, -2.0, 4.0],
        ];
        let inv = invert(&a).unwrap();
        for (i, row) in a.iter().enumerate() {
            for j in 0..3 {
                let col: Vec<f64> = inv.iter().map(|r| r[j]).collect();
                let expected = if i == j { 1.0 } else { 0.0 };
                let got: f64 = row.iter().zip(&col).map(|(x, y)| x * y).sum();
                assert_relative_eq!(got, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn needs_pivoting() {
        // zero in the leading position
        let a = vec![vec![0.0, 1.0], vec![2.0, 3.0]];
        let inv = invert(&a).unwrap();
        let x = multiply(&inv, &[1.0, 5.0]);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn singular_and_malformed_matrices_are_rejected() {
        assert!(invert(&[vec![1.0, 2.0], vec![2.0, 4.0]]).is_none());
        assert!(invert(&[vec![2.0, 0.0], vec![0.0, 0.0]]).is_none());
        assert!(invert(&[vec![1.0, f64::NAN], vec![0.0, 1.0]]).is_none());
        assert!(invert(&[vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn multiply_matrix_vector() {
        let a = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert_eq!(multiply(&a, &[1.0, -1.0]), vec![-1.0, -1.0]);
    }
}
