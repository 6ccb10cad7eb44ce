//! Log Loss (negative log-likelihood) for binary targets.
//!
//! Predictions `yhat` are on the log-odds scale. The gradient and hessian are
//! taken with respect to `yhat`, which is what the Newton solvers and the
//! stump booster step on.
use crate::utils::{bound_probability, expit};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Deserialize, Serialize, Clone)]
/// Log Loss (binary cross-entropy) objective.
pub struct LogLoss {}

impl LogLoss {
    /// Per-sample loss.
    #[inline]
    pub fn loss(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> Vec<f64> {
        match sample_weight {
            Some(sample_weight) => y
                .iter()
                .zip(yhat)
                .zip(sample_weight)
                .map(|((y_, yhat_), w_)| self.loss_single(*y_, *yhat_) * *w_)
                .collect(),
            None => y
                .iter()
                .zip(yhat)
                .map(|(y_, yhat_)| self.loss_single(*y_, *yhat_))
                .collect(),
        }
    }

    /// Loss of a single observation, computed stably on the log-odds scale.
    #[inline]
    pub fn loss_single(&self, y: f64, yhat: f64) -> f64 {
        // -(y * ln(p) + (1 - y) * ln(1 - p)) with p = expit(yhat)
        let softplus = if yhat > 0.0 {
            yhat + (-yhat).exp().ln_1p()
        } else {
            yhat.exp().ln_1p()
        };
        softplus - y * yhat
    }

    /// Binomial deviance, twice the summed (weighted) loss.
    pub fn deviance(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> f64 {
        2.0 * self.loss(y, yhat, sample_weight).iter().sum::<f64>()
    }

    /// Per-sample gradient and hessian.
    ///
    /// `g = (p - y) * w`, `h = p * (1 - p) * w`.
    #[inline]
    pub fn gradient(&self, y: &[f64], yhat: &[f64], sample_weight: Option<&[f64]>) -> (Vec<f64>, Vec<f64>) {
        let len = y.len();
        let mut g = Vec::with_capacity(len);
        let mut h = Vec::with_capacity(len);
        for i in 0..len {
            let p = expit(yhat[i]);
            let w = sample_weight.map_or(1.0, |w| w[i]);
            g.push((p - y[i]) * w);
            h.push(p * (1.0 - p) * w);
        }
        (g, h)
    }

    /// Log-odds of the (weighted) prevalence, bounded away from 0 and 1.
    pub fn initial_value(&self, y: &[f64], sample_weight: Option<&[f64]>, bound: f64) -> f64 {
        let (ytot, ntot) = match sample_weight {
            Some(w) => y
                .iter()
                .zip(w)
                .fold((0.0, 0.0), |(yt, nt), (y_, w_)| (yt + y_ * w_, nt + w_)),
            None => (y.iter().sum::<f64>(), y.len() as f64),
        };
        let p = bound_probability(ytot / ntot, bound);
        (p / (1.0 - p)).ln()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_loss() {
        let y = vec![1.0, 0.0];
        let yhat = vec![1.0, -1.0];
        let loss_fn = LogLoss::default();

        let l = loss_fn.loss(&y, &yhat, None);
        assert_eq!(l.len(), 2);
        // p = 1/(1+e^-1) = 0.73105857863
        // loss = -ln(0.731) = 0.31326168751
        assert!((l[0] - 0.3132617).abs() < 1e-6);
        assert!((l[1] - 0.3132617).abs() < 1e-6);

        let (g, h) = loss_fn.gradient(&y, &yhat, None);
        assert!((g[0] - (-0.2689414)).abs() < 1e-6);
        assert!((h[0] - 0.1966119).abs() < 1e-6);

        // large log-odds stay finite
        assert!(loss_fn.loss_single(0.0, 800.0).is_finite());
    }

    #[test]
    fn test_log_loss_init() {
        let y = vec![1.0, 1.0, 0.0];
        let loss_fn = LogLoss::default();
        assert!((loss_fn.initial_value(&y, None, 1e-6) - 0.693147).abs() < 1e-6);
        let w = vec![1.0, 0.0, 1.0];
        assert!(loss_fn.initial_value(&y, Some(&w), 1e-6).abs() < 1e-12);
        assert!(loss_fn.initial_value(&[1.0, 1.0], None, 1e-6).is_finite());
    }
}
