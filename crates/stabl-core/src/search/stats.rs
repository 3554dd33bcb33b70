//! Small statistics kernel: covariance, partial correlation, regression and
//! the distribution tails the tests need.

use nalgebra::{DMatrix, DVector};

use crate::error::{Result, StablError};

/// Sample covariance of the columns of `data` (n_rows × n_vars).
pub fn covariance(data: &DMatrix<f64>) -> DMatrix<f64> {
    let n = data.nrows();
    let p = data.ncols();
    if n < 2 {
        return DMatrix::zeros(p, p);
    }
    let means = data.row_mean();
    let mut centered = data.clone();
    for mut row in centered.row_iter_mut() {
        row -= &means;
    }
    (centered.transpose() * &centered) / (n as f64 - 1.0)
}

/// Correlation matrix from a covariance matrix. Zero-variance columns get
/// zero correlation with everything else.
pub fn correlation(cov: &DMatrix<f64>) -> DMatrix<f64> {
    let sd: Vec<f64> = cov.diagonal().iter().map(|v| v.max(0.0).sqrt()).collect();
    DMatrix::from_fn(cov.nrows(), cov.ncols(), |i, j| {
        if i == j {
            1.0
        } else if sd[i] > 0.0 && sd[j] > 0.0 {
            cov[(i, j)] / (sd[i] * sd[j])
        } else {
            0.0
        }
    })
}

fn submatrix(m: &DMatrix<f64>, idx: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(idx.len(), idx.len(), |i, j| m[(idx[i], idx[j])])
}

fn invert(m: DMatrix<f64>, operation: &'static str) -> Result<DMatrix<f64>> {
    if let Some(inv) = m.clone().try_inverse() {
        return Ok(inv);
    }
    m.pseudo_inverse(1e-12)
        .map_err(|e| StablError::numeric(operation, e.to_string()))
}

/// Partial correlation of `x` and `y` given `z`, from a correlation (or
/// covariance) matrix.
pub fn partial_correlation(corr: &DMatrix<f64>, x: usize, y: usize, z: &[usize]) -> Result<f64> {
    if z.is_empty() {
        let denom = (corr[(x, x)] * corr[(y, y)]).sqrt();
        return Ok(if denom > 0.0 { corr[(x, y)] / denom } else { 0.0 });
    }
    let mut idx = Vec::with_capacity(z.len() + 2);
    idx.push(x);
    idx.push(y);
    idx.extend_from_slice(z);

    let precision = invert(submatrix(corr, &idx), "partial correlation")?;
    let denom = (precision[(0, 0)] * precision[(1, 1)]).sqrt();
    if !denom.is_finite() || denom <= 0.0 {
        return Err(StablError::numeric(
            "partial correlation",
            "non-positive conditional variance",
        ));
    }
    Ok((-precision[(0, 1)] / denom).clamp(-1.0, 1.0))
}

/// OLS coefficients of `y` on `regressors`, from a covariance matrix.
pub fn regression_coefficients(
    cov: &DMatrix<f64>,
    y: usize,
    regressors: &[usize],
) -> Result<DVector<f64>> {
    if regressors.is_empty() {
        return Ok(DVector::zeros(0));
    }
    let sxx = submatrix(cov, regressors);
    let sxy = DVector::from_fn(regressors.len(), |i, _| cov[(regressors[i], y)]);

    if let Some(chol) = sxx.clone().cholesky() {
        return Ok(chol.solve(&sxy));
    }
    let inv = invert(sxx, "regression")?;
    Ok(inv * sxy)
}

/// Residual variance of `y` after regressing on `regressors`.
pub fn residual_variance(cov: &DMatrix<f64>, y: usize, regressors: &[usize]) -> Result<f64> {
    let beta = regression_coefficients(cov, y, regressors)?;
    let explained: f64 = regressors
        .iter()
        .zip(beta.iter())
        .map(|(&r, b)| b * cov[(r, y)])
        .sum();
    Ok((cov[(y, y)] - explained).max(f64::MIN_POSITIVE))
}

/// Error function, Abramowitz & Stegun 7.1.26 (|error| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal CDF.
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Upper tail of the chi-square distribution (Wilson–Hilferty approximation).
pub fn chi_square_sf(stat: f64, dof: usize) -> f64 {
    if dof == 0 {
        return 1.0;
    }
    if stat <= 0.0 {
        return 1.0;
    }
    let k = dof as f64;
    let h = 2.0 / (9.0 * k);
    let z = ((stat / k).powf(1.0 / 3.0) - (1.0 - h)) / h.sqrt();
    (1.0 - normal_cdf(z)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_cdf_reference_points() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-7);
        assert_relative_eq!(normal_cdf(1.959964), 0.975, epsilon = 1e-5);
        assert_relative_eq!(normal_cdf(-1.959964), 0.025, epsilon = 1e-5);
    }

    #[test]
    fn test_chi_square_tail() {
        // 95th percentile of chi2(1) is 3.841, of chi2(4) is 9.488
        assert!((chi_square_sf(3.841, 1) - 0.05).abs() < 0.01);
        assert!((chi_square_sf(9.488, 4) - 0.05).abs() < 0.005);
        assert_eq!(chi_square_sf(0.0, 3), 1.0);
    }

    #[test]
    fn test_covariance_and_regression_recover_slope() {
        // y = 2x + 1 exactly, z = -x
        let rows: Vec<[f64; 3]> = (0..10)
            .map(|i| {
                let x = i as f64;
                [x, 2.0 * x + 1.0, (i % 3) as f64]
            })
            .collect();
        let data = DMatrix::from_fn(10, 3, |i, j| rows[i][j]);
        let cov = covariance(&data);
        let beta = regression_coefficients(&cov, 1, &[0]).unwrap();
        assert_relative_eq!(beta[0], 2.0, epsilon = 1e-9);
        assert!(residual_variance(&cov, 1, &[0]).unwrap() < 1e-9);

        let corr = correlation(&cov);
        assert_relative_eq!(corr[(0, 1)], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_partial_correlation_removes_common_cause() {
        // a = c + e1, b = c + e2 with e1, e2 orthogonal to c and each other
        let c = [1.0, -1.0, 1.0, -1.0, 2.0, -2.0, 2.0, -2.0];
        let e1 = [1.0, 1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0];
        let e2 = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, -1.0, -1.0];
        let data = DMatrix::from_fn(8, 3, |i, j| match j {
            0 => c[i] + e1[i],
            1 => c[i] + e2[i],
            _ => c[i],
        });
        let corr = correlation(&covariance(&data));
        assert!(partial_correlation(&corr, 0, 1, &[]).unwrap() > 0.5);
        assert!(partial_correlation(&corr, 0, 1, &[2]).unwrap().abs() < 1e-9);
    }
}
