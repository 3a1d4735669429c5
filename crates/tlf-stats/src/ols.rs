//! Ordinary least squares via the normal equations.
//!
//! `XᵀX` is inverted by Gauss-Jordan elimination with partial pivoting; the
//! inverse scaled by `σ²` is the coefficient covariance.

use ndarray::{Array1, Array2, ArrayView1};

use crate::error::ComputationError;

/// Relative pivot tolerance below which `XᵀX` is treated as singular.
const PIVOT_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct OlsFit {
    pub beta: Array1<f64>,
    /// `(XᵀX)⁻¹`; multiply by `sigma2` for the coefficient covariance.
    pub xtx_inv: Array2<f64>,
    pub rss: f64,
    pub n: usize,
    pub p: usize,
}

impl OlsFit {
    /// Residual degrees of freedom `n - p`.
    #[must_use]
    pub const fn df(&self) -> usize {
        self.n - self.p
    }

    /// Residual variance `RSS / (n - p)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn sigma2(&self) -> f64 {
        self.rss / self.df() as f64
    }

    /// `l·β` and its standard error for a contrast vector `l`.
    #[must_use]
    pub fn contrast(&self, l: ArrayView1<'_, f64>) -> (f64, f64) {
        let estimate = l.dot(&self.beta);
        let variance = l.dot(&self.xtx_inv.dot(&l)) * self.sigma2();
        (estimate, variance.max(0.0).sqrt())
    }
}

/// Fit `y = Xβ + ε`.
///
/// # Errors
///
/// [`ComputationError::InsufficientData`] when `n <= p`, and
/// [`ComputationError::SingularDesign`] when `XᵀX` is not invertible.
pub fn fit(x: &Array2<f64>, y: &Array1<f64>) -> Result<OlsFit, ComputationError> {
    let (n, p) = x.dim();
    if n <= p {
        return Err(ComputationError::InsufficientData {
            reason: format!("{n} complete observations for {p} model parameters"),
        });
    }

    let xtx_inv = invert(x.t().dot(x)).ok_or_else(|| ComputationError::SingularDesign {
        reason: "model matrix is rank deficient (collinear or constant terms)".into(),
    })?;
    let beta = xtx_inv.dot(&x.t().dot(y));
    let residuals = y - &x.dot(&beta);
    let rss = residuals.dot(&residuals);

    Ok(OlsFit {
        beta,
        xtx_inv,
        rss,
        n,
        p,
    })
}

fn swap_rows(m: &mut Array2<f64>, a: usize, b: usize) {
    for col in 0..m.ncols() {
        m.swap([a, col], [b, col]);
    }
}

/// Gauss-Jordan inverse of a symmetric positive semi-definite matrix.
fn invert(mut a: Array2<f64>) -> Option<Array2<f64>> {
    let size = a.nrows();
    let scale = a.diag().iter().fold(1.0_f64, |m, v| m.max(v.abs()));
    let tolerance = PIVOT_TOLERANCE * scale;
    let mut inv = Array2::<f64>::eye(size);

    for col in 0..size {
        let pivot_row =
            (col..size).max_by(|&r, &s| a[[r, col]].abs().total_cmp(&a[[s, col]].abs()))?;
        if a[[pivot_row, col]].abs() < tolerance {
            return None;
        }
        if pivot_row != col {
            swap_rows(&mut a, col, pivot_row);
            swap_rows(&mut inv, col, pivot_row);
        }

        let pivot = a[[col, col]];
        a.row_mut(col).mapv_inplace(|v| v / pivot);
        inv.row_mut(col).mapv_inplace(|v| v / pivot);

        let pivot_a = a.row(col).to_owned();
        let pivot_inv = inv.row(col).to_owned();
        for row in (0..size).filter(|&r| r != col) {
            let factor = a[[row, col]];
            a.row_mut(row).scaled_add(-factor, &pivot_a);
            inv.row_mut(row).scaled_add(-factor, &pivot_inv);
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use ndarray::{Array, array};

    use super::*;

    #[test]
    fn simple_regression_recovers_line() {
        // y = 1 + 2x exactly
        let x = Array::from_shape_fn((5, 2), |(i, j)| if j == 0 { 1.0 } else { i as f64 });
        let y = array![1.0, 3.0, 5.0, 7.0, 9.0];
        let fit = fit(&x, &y).expect("fit");
        assert!((fit.beta[0] - 1.0).abs() < 1e-9);
        assert!((fit.beta[1] - 2.0).abs() < 1e-9);
        assert!(fit.rss.abs() < 1e-9);
        assert_eq!(fit.df(), 3);
    }

    #[test]
    fn collinear_columns_are_singular() {
        let x = Array::from_shape_fn((4, 3), |(i, j)| match j {
            0 => 1.0,
            1 => i as f64,
            _ => 2.0 * i as f64,
        });
        let y = array![1.0, 2.0, 2.5, 4.0];
        assert!(matches!(fit(&x, &y), Err(ComputationError::SingularDesign { .. })));
    }

    #[test]
    fn too_few_observations() {
        let x = array![[1.0, 0.0], [1.0, 1.0]];
        assert!(matches!(
            fit(&x, &array![1.0, 2.0]),
            Err(ComputationError::InsufficientData { .. })
        ));
    }

    #[test]
    fn inverse_of_diagonal() {
        let inv = invert(array![[2.0, 0.0], [0.0, 4.0]]).expect("invertible");
        assert!((inv[[0, 0]] - 0.5).abs() < 1e-12);
        assert!((inv[[1, 1]] - 0.25).abs() < 1e-12);
        assert!(inv[[0, 1]].abs() < 1e-12);
    }
}
