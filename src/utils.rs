use crate::errors::DisparityError;
use serde::{Deserialize, Serialize};

/// Create a string of all available items.
pub fn items_to_strings(items: Vec<&str>) -> String {
    let mut s = String::new();
    for i in items {
        s.push_str(i);
        s.push_str(&String::from(", "));
    }
    s
}

// Validation
pub fn validate_positive_float_parameter(value: f64, parameter: &str) -> Result<(), DisparityError> {
    validate_float_parameter(value, 0.0, f64::INFINITY, parameter)
}

pub fn validate_float_parameter(value: f64, min: f64, max: f64, parameter: &str) -> Result<(), DisparityError> {
    if value.is_nan() || value < min || max < value {
        let ex_msg = format!("real value within range {} and {}", min, max);
        Err(DisparityError::InvalidParameter(
            parameter.to_string(),
            ex_msg,
            value.to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Logistic function.
#[inline]
pub fn expit(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

/// Log-odds of a probability, after bounding it away from 0 and 1.
#[inline]
pub fn logit(p: f64, bound: f64) -> f64 {
    let p = bound_probability(p, bound);
    (p / (1.0 - p)).ln()
}

/// Clip a probability into `[bound, 1 - bound]`.
#[inline]
pub fn bound_probability(p: f64, bound: f64) -> f64 {
    p.clamp(bound, 1.0 - bound)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Quantile of already sorted values, linear interpolation between order
/// statistics (type 7).
pub fn sorted_quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let h = (n - 1) as f64 * q;
            let lo = h.floor() as usize;
            let hi = h.ceil() as usize;
            sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
        }
    }
}

/// Six-number summary of a distribution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub mean: f64,
    pub q3: f64,
    pub max: f64,
}

impl Summary {
    pub fn new(values: &[f64]) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));
        Summary {
            min: sorted.first().copied().unwrap_or(f64::NAN),
            q1: sorted_quantile(&sorted, 0.25),
            median: sorted_quantile(&sorted, 0.5),
            mean: mean(&sorted),
            q3: sorted_quantile(&sorted, 0.75),
            max: sorted.last().copied().unwrap_or(f64::NAN),
        }
    }
}
