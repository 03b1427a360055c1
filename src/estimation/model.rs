//! Regression models used by the effect estimator.

use crate::estimation::ModelError;
use nalgebra::{DMatrix, DVector};

/// Dense feature matrix, one row per observation
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    inner: DMatrix<f64>,
}

impl Matrix {
    /// Creates a matrix from row-major data
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, ModelError> {
        if data.len() != rows * cols {
            return Err(ModelError::DimensionMismatch {
                expected: rows * cols,
                found: data.len(),
            });
        }
        Ok(Matrix {
            inner: DMatrix::from_row_slice(rows, cols, &data),
        })
    }

    /// Creates a matrix whose columns are the given vectors
    ///
    /// With no columns the row count is `rows`, so an intercept-only design
    /// still has a shape.
    pub fn from_columns(rows: usize, columns: &[Vec<f64>]) -> Result<Self, ModelError> {
        for column in columns {
            if column.len() != rows {
                return Err(ModelError::DimensionMismatch {
                    expected: rows,
                    found: column.len(),
                });
            }
        }
        Ok(Matrix {
            inner: DMatrix::from_fn(rows, columns.len(), |i, j| columns[j][i]),
        })
    }

    pub fn rows(&self) -> usize {
        self.inner.nrows()
    }

    pub fn cols(&self) -> usize {
        self.inner.ncols()
    }

    pub fn row(&self, row: usize) -> Vec<f64> {
        self.inner.row(row).iter().copied().collect()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.inner[(row, col)]
    }

    /// Underlying column-major storage
    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.inner
    }

    /// Copy with every entry of column `col` set to `value`
    pub fn with_column_replaced(&self, col: usize, value: f64) -> Result<Matrix, ModelError> {
        if col >= self.cols() {
            return Err(ModelError::DimensionMismatch {
                expected: self.cols(),
                found: col + 1,
            });
        }
        let mut replaced = self.inner.clone();
        replaced.column_mut(col).fill(value);
        Ok(Matrix { inner: replaced })
    }
}

/// Anything that can be fitted on a feature matrix and then predict
pub trait Regressor {
    fn fit(&mut self, features: &Matrix, target: &[f64]) -> Result<(), ModelError>;

    fn predict(&self, features: &Matrix) -> Result<Vec<f64>, ModelError>;
}

#[derive(Debug, Clone, PartialEq)]
struct Coefficients {
    intercept: f64,
    weights: DVector<f64>,
}

/// Least squares with an optional ridge penalty
///
/// Features are centred and scaled to unit variance before solving, so the
/// penalty and the rank cutoff do not depend on column units. The intercept
/// is never penalised. Rank-deficient designs (full dummy sets, constant
/// columns, duplicated columns) get the minimum-norm solution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearRegression {
    ridge: f64,
    fitted: Option<Coefficients>,
}

impl LinearRegression {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ridge(ridge: f64) -> Self {
        LinearRegression {
            ridge: ridge.max(0.0),
            fitted: None,
        }
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fitted.as_ref().map(|c| c.intercept)
    }

    pub fn weights(&self) -> Option<&[f64]> {
        self.fitted.as_ref().map(|c| c.weights.as_slice())
    }
}

/// Column means and standard deviations; constant columns get scale 0
fn column_moments(x: &DMatrix<f64>) -> (Vec<f64>, Vec<f64>) {
    let n = x.nrows() as f64;
    x.column_iter()
        .map(|column| {
            let mean = column.sum() / n;
            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let scale = variance.sqrt();
            let constant = scale <= f64::EPSILON * mean.abs().max(1.0);
            (mean, if constant { 0.0 } else { scale })
        })
        .unzip()
}

impl Regressor for LinearRegression {
    fn fit(&mut self, features: &Matrix, target: &[f64]) -> Result<(), ModelError> {
        let x = features.as_dmatrix();
        let n = x.nrows();
        let p = x.ncols();
        if n == 0 {
            return Err(ModelError::EmptyTraining);
        }
        if target.len() != n {
            return Err(ModelError::DimensionMismatch {
                expected: n,
                found: target.len(),
            });
        }

        let target_mean = target.iter().sum::<f64>() / n as f64;
        if p == 0 {
            self.fitted = Some(Coefficients {
                intercept: target_mean,
                weights: DVector::zeros(0),
            });
            return Ok(());
        }

        let (means, scales) = column_moments(x);
        let penalty = self.ridge.sqrt();

        // standardized design stacked on sqrt(ridge) * I
        let design = DMatrix::from_fn(n + p, p, |i, j| {
            if i < n {
                if scales[j] > 0.0 {
                    (x[(i, j)] - means[j]) / scales[j]
                } else {
                    0.0
                }
            } else if i - n == j {
                penalty
            } else {
                0.0
            }
        });
        let response = DVector::from_fn(n + p, |i, _| if i < n { target[i] - target_mean } else { 0.0 });

        let svd = design.svd(true, true);
        let largest = svd.singular_values.max();
        let cutoff = largest * (n + p) as f64 * f64::EPSILON;
        let standardized = svd.solve(&response, cutoff).map_err(|_| ModelError::Singular)?;

        let weights = DVector::from_fn(p, |j, _| {
            if scales[j] > 0.0 {
                standardized[j] / scales[j]
            } else {
                0.0
            }
        });
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ModelError::Singular);
        }
        let intercept = target_mean
            - weights
                .iter()
                .zip(&means)
                .map(|(w, m)| w * m)
                .sum::<f64>();

        self.fitted = Some(Coefficients { intercept, weights });
        Ok(())
    }

    fn predict(&self, features: &Matrix) -> Result<Vec<f64>, ModelError> {
        let fitted = self.fitted.as_ref().ok_or(ModelError::NotFitted)?;
        if features.cols() != fitted.weights.len() {
            return Err(ModelError::DimensionMismatch {
                expected: fitted.weights.len(),
                found: features.cols(),
            });
        }
        let linear = features.as_dmatrix() * &fitted.weights;
        Ok(linear.iter().map(|v| v + fitted.intercept).collect())
    }
}
