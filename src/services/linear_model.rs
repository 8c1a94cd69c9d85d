//! Ordinary least squares shared by the demand and price-elasticity models.
//!
//! The system is solved through an SVD with a relative singular-value cutoff,
//! giving the minimum-norm solution when columns are collinear (the bias column
//! equals the sum of the day-of-week indicators). Normal equations are never
//! formed.

use nalgebra::{DMatrix, DVector, SVD};
use ndarray::{Array1, Array2};

use crate::errors::AppError;

const RELATIVE_RANK_CUTOFF: f64 = 1e-10;

/// Fitted coefficients, one per design-matrix column. A new fit always
/// produces a fresh value; there is no in-place update.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelWeights(Array1<f64>);

impl ModelWeights {
    pub fn from_vec(weights: Vec<f64>) -> Self {
        Self(Array1::from(weights))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, column: usize) -> Option<f64> {
        self.0.get(column).copied()
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

/// Minimise `||Xw - y||²`.
///
/// Fails with `InsufficientData` when there are fewer rows than columns.
pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<ModelWeights, AppError> {
    let (n, k) = x.dim();

    if k == 0 {
        return Err(AppError::Validation("Design matrix has no columns".to_string()));
    }
    if y.len() != n {
        return Err(AppError::Validation(format!(
            "Design matrix has {} rows but target has {} values",
            n,
            y.len()
        )));
    }
    if n < k {
        return Err(AppError::InsufficientData { required: k, actual: n });
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(AppError::Validation(
            "Design matrix and target must be finite".to_string(),
        ));
    }

    let a = DMatrix::from_fn(n, k, |i, j| x[[i, j]]);
    let b = DVector::from_iterator(n, y.iter().copied());

    let svd = SVD::try_new(a, true, true, f64::EPSILON, 0)
        .ok_or_else(|| AppError::Solver("SVD did not converge".to_string()))?;

    // Singular values below this are treated as exact rank deficiency
    let cutoff = svd.singular_values.max() * RELATIVE_RANK_CUTOFF;
    let solution = svd
        .solve(&b, cutoff)
        .map_err(|e| AppError::Solver(e.to_string()))?;

    if solution.iter().any(|w| !w.is_finite()) {
        return Err(AppError::Solver("Least-squares solution is not finite".to_string()));
    }

    Ok(ModelWeights(Array1::from_iter(solution.iter().copied())))
}

/// `X · w`, unclamped
pub fn predict(x: &Array2<f64>, weights: &ModelWeights) -> Result<Array1<f64>, AppError> {
    if x.ncols() != weights.len() {
        return Err(AppError::Validation(format!(
            "Feature rows have {} columns but model has {} weights",
            x.ncols(),
            weights.len()
        )));
    }
    Ok(x.dot(&weights.0))
}

/// `y - X · w`
pub fn residuals(
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: &ModelWeights,
) -> Result<Array1<f64>, AppError> {
    Ok(y - &predict(x, weights)?)
}
