//! Logistic regression fit by iteratively reweighted least squares.
//!
//! [`fit_logistic`] is shared by the `Glm` candidates and by the one
//! dimensional fluctuation submodels of the targeting step, which need the
//! offset and weight arguments.
use crate::constants::{IRLS_MAX_ITER, IRLS_TOLERANCE, RIDGE_JITTER};
use crate::data::Matrix;
use crate::errors::DisparityError;
use crate::learner::{FittedLearner, Learner};
use crate::objective::LogLoss;
use crate::utils::expit;
use faer::linalg::solvers::{Llt, Solve};
use faer::{Mat, Side};
use log::warn;
use ndarray::{Array1, Array2, ArrayView1, Axis};

/// Result of a logistic regression fit.
#[derive(Debug, Clone)]
pub struct LogisticFit {
    /// One coefficient per column of the design.
    pub coefficients: Vec<f64>,
    /// Binomial deviance at the returned coefficients.
    pub deviance: f64,
    /// Newton iterations performed.
    pub iterations: usize,
    /// Whether the relative deviance change fell under the tolerance.
    pub converged: bool,
}

/// Dense `rows x cols` copy of a column-major matrix.
fn to_array(x: &Matrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((x.rows, x.cols), |(i, j)| *x.get(i, j))
}

fn linear_predictor(x: &Array2<f64>, beta: &Array1<f64>, offset: Option<&[f64]>) -> Vec<f64> {
    let mut eta = x.dot(beta);
    if let Some(o) = offset {
        eta += &ArrayView1::from(o);
    }
    eta.to_vec()
}

/// Solve `a x = b` through a Cholesky factorization of the symmetric `a`.
/// `None` when `a` is not positive definite.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let p = b.len();
    let a = Mat::from_fn(p, p, |i, j| a[[i, j]]);
    let llt = Llt::new(a.as_ref(), Side::Lower).ok()?;
    let mut rhs = Mat::from_fn(p, 1, |i, _| b[i]);
    llt.solve_in_place(rhs.as_mut());
    let x = Array1::from_shape_fn(p, |i| rhs[(i, 0)]);
    x.iter().all(|v| v.is_finite()).then_some(x)
}

/// Solve the Newton system, adding a growing ridge to the diagonal when the
/// information matrix is singular (aliased or constant columns).
fn solve_with_jitter(info: &Array2<f64>, score: &Array1<f64>) -> Option<Array1<f64>> {
    if let Some(step) = cholesky_solve(info, score) {
        return Some(step);
    }
    let max_diag = info.diag().iter().copied().fold(1.0_f64, f64::max);
    let identity = Array2::<f64>::eye(score.len());
    let mut lambda = RIDGE_JITTER * max_diag;
    for _ in 0..8 {
        let ridged = info + &(&identity * lambda);
        if let Some(step) = cholesky_solve(&ridged, score) {
            return Some(step);
        }
        lambda *= 100.0;
    }
    None
}

/// Maximum likelihood logistic regression of binary `y` on the columns of `x`.
///
/// * `x` - Design matrix; no intercept column is added.
/// * `y` - Binary target.
/// * `offset` - Optional fixed log-odds added to the linear predictor.
/// * `sample_weight` - Optional non-negative weights.
/// * `max_iter` - Newton iteration limit.
/// * `tolerance` - Convergence bound on `|dev - dev_old| / (|dev| + 0.1)`.
pub fn fit_logistic(
    x: &Matrix<f64>,
    y: &[f64],
    offset: Option<&[f64]>,
    sample_weight: Option<&[f64]>,
    max_iter: usize,
    tolerance: f64,
) -> Result<LogisticFit, DisparityError> {
    let loss = LogLoss::default();
    let x = to_array(x);
    let p = x.ncols();
    let mut beta = Array1::<f64>::zeros(p);
    let mut eta = linear_predictor(&x, &beta, offset);
    let mut deviance = loss.deviance(y, &eta, sample_weight);
    if p == 0 {
        return Ok(LogisticFit {
            coefficients: beta.to_vec(),
            deviance,
            iterations: 0,
            converged: true,
        });
    }

    let mut converged = false;
    let mut iterations = 0;
    while iterations < max_iter {
        iterations += 1;
        let (g, h) = loss.gradient(y, &eta, sample_weight);

        // score = -X'g, information = X' diag(h) X
        let score = x.t().dot(&Array1::from(g)).mapv(|v| -v);
        let weighted = &x * &Array1::from(h).insert_axis(Axis(1));
        let info = x.t().dot(&weighted);

        let step = solve_with_jitter(&info, &score).ok_or_else(|| {
            DisparityError::FitFailed("Glm".to_string(), "information matrix is singular".to_string())
        })?;

        // Step halving until the deviance does not increase.
        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..30 {
            let candidate = &beta + &(&step * t);
            let candidate_eta = linear_predictor(&x, &candidate, offset);
            let candidate_dev = loss.deviance(y, &candidate_eta, sample_weight);
            if candidate_dev.is_finite() && candidate_dev <= deviance + 1e-10 * deviance.abs().max(1.0) {
                accepted = Some((candidate, candidate_eta, candidate_dev));
                break;
            }
            t *= 0.5;
        }
        let Some((candidate, candidate_eta, candidate_dev)) = accepted else {
            // No descent direction left at numerical precision.
            converged = true;
            break;
        };

        let change = (deviance - candidate_dev).abs() / (candidate_dev.abs() + 0.1);
        beta = candidate;
        eta = candidate_eta;
        deviance = candidate_dev;
        if change < tolerance {
            converged = true;
            break;
        }
    }

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(DisparityError::FitFailed(
            "Glm".to_string(),
            "non-finite coefficients".to_string(),
        ));
    }

    Ok(LogisticFit {
        coefficients: beta.to_vec(),
        deviance,
        iterations,
        converged,
    })
}

/// Logistic regression candidate with an intercept and, optionally, all
/// pairwise products of the covariates.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    pub interactions: bool,
}

impl LogisticRegression {
    pub fn new(interactions: bool) -> Self {
        LogisticRegression { interactions }
    }
}

/// Column-major design with a leading intercept column.
pub fn expand_design(x: &Matrix<f64>, interactions: bool) -> (Vec<f64>, usize) {
    let n = x.rows;
    let mut cols = 1 + x.cols;
    if interactions {
        cols += x.cols * x.cols.saturating_sub(1) / 2;
    }
    let mut design = Vec::with_capacity(n * cols);
    design.extend(std::iter::repeat(1.0).take(n));
    design.extend_from_slice(&x.data[..n * x.cols]);
    if interactions {
        for j in 0..x.cols {
            for k in (j + 1)..x.cols {
                let (cj, ck) = (x.get_col(j), x.get_col(k));
                design.extend(cj.iter().zip(ck).map(|(a, b)| a * b));
            }
        }
    }
    (design, cols)
}

#[derive(Debug, Clone)]
pub struct FittedLogistic {
    pub coefficients: Vec<f64>,
    pub interactions: bool,
}

impl Learner for LogisticRegression {
    fn fit(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<Box<dyn FittedLearner>, DisparityError> {
        let (design, cols) = expand_design(x, self.interactions);
        let design = Matrix::new(&design, x.rows, cols);
        let fit = fit_logistic(&design, y, None, sample_weight, IRLS_MAX_ITER, IRLS_TOLERANCE)
            .map_err(|e| DisparityError::FitFailed(self.name(), e.to_string()))?;
        if !fit.converged {
            warn!(
                "{} did not converge in {} iterations, fitted probabilities may be numerically 0 or 1.",
                self.name(),
                fit.iterations
            );
        }
        Ok(Box::new(FittedLogistic {
            coefficients: fit.coefficients,
            interactions: self.interactions,
        }))
    }

    fn name(&self) -> String {
        if self.interactions {
            "GlmInteraction".to_string()
        } else {
            "Glm".to_string()
        }
    }
}

impl FittedLearner for FittedLogistic {
    fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
        let (design, cols) = expand_design(x, self.interactions);
        let design = to_array(&Matrix::new(&design, x.rows, cols));
        linear_predictor(&design, &Array1::from(self.coefficients.clone()), None)
            .into_iter()
            .map(expit)
            .collect()
    }
}
