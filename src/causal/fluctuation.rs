//! One-dimensional logistic fluctuation submodels used by the targeting step.
use crate::constants::{FLUCTUATION_MAX_ITER, IRLS_TOLERANCE};
use crate::data::Matrix;
use crate::errors::DisparityError;
use crate::learner::fit_logistic;
use log::warn;

/// Fit `logit P(target = 1) = offset + eps * covariate` and return `eps`.
///
/// With `covariate = None` the submodel is intercept-only.
///
/// * `target` - Binary response.
/// * `offset` - Current log-odds of each row.
/// * `covariate` - Clever covariate, or `None` for an intercept.
/// * `weights` - Optional observation weights.
pub fn fit_fluctuation(
    target: &[f64],
    offset: &[f64],
    covariate: Option<&[f64]>,
    weights: Option<&[f64]>,
) -> Result<f64, DisparityError> {
    let ones;
    let column = match covariate {
        Some(c) => c,
        None => {
            ones = vec![1.0; target.len()];
            &ones
        }
    };
    let x = Matrix::new(column, target.len(), 1);
    let fit = fit_logistic(&x, target, Some(offset), weights, FLUCTUATION_MAX_ITER, IRLS_TOLERANCE)?;
    if !fit.converged {
        warn!(
            "Fluctuation did not converge after {} iterations; using the last step.",
            fit.iterations
        );
    }
    let eps = fit.coefficients[0];
    if !eps.is_finite() {
        return Err(DisparityError::FitFailed(
            "fluctuation".to_string(),
            format!("non-finite coefficient {}", eps),
        ));
    }
    Ok(eps)
}
