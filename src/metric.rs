use crate::errors::DisparityError;
use crate::utils::{bound_probability, items_to_strings};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Compare two metric values, determining if b is better.
/// If one of them is NaN favor the non NaN value.
/// If both are NaN, consider the first value to be better.
pub fn is_comparison_better(value: f64, comparison: f64, maximize: bool) -> bool {
    match (value.is_nan(), comparison.is_nan()) {
        // Both nan, comparison is not better,
        // Or comparison is nan, also not better
        (true, true) | (false, true) => false,
        // comparison is not Nan, it's better
        (true, false) => true,
        (false, false) => {
            if maximize {
                value < comparison
            } else {
                value > comparison
            }
        }
    }
}

/// Loss used to score held-out predictions during cross-validation.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Default)]
pub enum Metric {
    /// Mean squared error of the predicted probability (Brier score).
    #[default]
    SquaredError,
    /// Mean negative Bernoulli log-likelihood.
    LogLoss,
}

impl FromStr for Metric {
    type Err = DisparityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SquaredError" => Ok(Metric::SquaredError),
            "LogLoss" => Ok(Metric::LogLoss),
            _ => Err(DisparityError::ParseString(
                s.to_string(),
                "Metric".to_string(),
                items_to_strings(vec!["SquaredError", "LogLoss"]),
            )),
        }
    }
}

impl Metric {
    /// Risk of probability predictions `p` against binary `y`.
    pub fn risk(&self, y: &[f64], p: &[f64], bound: f64) -> f64 {
        match self {
            Metric::SquaredError => squared_error(y, p),
            Metric::LogLoss => log_loss(y, p, bound),
        }
    }

    /// Lower values are better for every supported metric.
    pub fn maximize(&self) -> bool {
        false
    }
}

pub fn squared_error(y: &[f64], p: &[f64]) -> f64 {
    let n = y.len() as f64;
    y.iter().zip(p).map(|(y_, p_)| (y_ - p_) * (y_ - p_)).sum::<f64>() / n
}

pub fn log_loss(y: &[f64], p: &[f64], bound: f64) -> f64 {
    let n = y.len() as f64;
    y.iter()
        .zip(p)
        .map(|(y_, p_)| {
            let p_ = bound_probability(*p_, bound);
            -(y_ * p_.ln() + (1.0 - y_) * (1.0 - p_).ln())
        })
        .sum::<f64>()
        / n
}
