//! Boosted Stumps
//!
//! Gradient boosting of depth-one trees on the log loss. Each round picks the
//! single split with the largest second order gain and adds its shrunken leaf
//! weights to the log-odds.
use crate::constants::{HESSIAN_EPS, PROBABILITY_BOUND, STUMP_LEARNING_RATE, STUMP_ROUNDS};
use crate::data::Matrix;
use crate::errors::DisparityError;
use crate::learner::{FittedLearner, Learner};
use crate::objective::LogLoss;
use crate::utils::{expit, validate_positive_float_parameter};

/// L2 penalty on leaf weights.
const LAMBDA: f64 = 1.0;

#[inline]
fn weight(gradient_sum: f64, hessian_sum: f64) -> f64 {
    -gradient_sum / (hessian_sum + LAMBDA)
}

#[inline]
fn gain(gradient_sum: f64, hessian_sum: f64) -> f64 {
    (gradient_sum * gradient_sum) / (hessian_sum + LAMBDA)
}

#[derive(Debug, Clone)]
pub struct BoostedStumps {
    pub rounds: usize,
    pub learning_rate: f64,
}

impl BoostedStumps {
    pub fn new(rounds: Option<usize>, learning_rate: Option<f64>) -> Self {
        BoostedStumps {
            rounds: rounds.unwrap_or(STUMP_ROUNDS),
            learning_rate: learning_rate.unwrap_or(STUMP_LEARNING_RATE),
        }
    }
}

/// A single split; rows with `x[feature] < threshold` go left.
#[derive(Debug, Clone, PartialEq)]
pub struct Stump {
    pub feature: usize,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
}

#[derive(Debug, Clone)]
pub struct FittedStumps {
    pub base_score: f64,
    pub stumps: Vec<Stump>,
}

fn best_split(x: &Matrix<f64>, order: &[Vec<usize>], grad: &[f64], hess: &[f64]) -> Option<(f64, Stump)> {
    let g_total: f64 = grad.iter().sum();
    let h_total: f64 = hess.iter().sum();
    let parent = gain(g_total, h_total);
    let mut best: Option<(f64, Stump)> = None;

    for (feature, idx) in order.iter().enumerate() {
        let col = x.get_col(feature);
        let (mut gl, mut hl) = (0.0, 0.0);
        for w in idx.windows(2) {
            let (i, next) = (w[0], w[1]);
            gl += grad[i];
            hl += hess[i];
            if col[i] == col[next] {
                continue;
            }
            let (gr, hr) = (g_total - gl, h_total - hl);
            if hl < HESSIAN_EPS || hr < HESSIAN_EPS {
                continue;
            }
            let split_gain = gain(gl, hl) + gain(gr, hr) - parent;
            if split_gain > best.as_ref().map_or(0.0, |(b, _)| *b) {
                best = Some((
                    split_gain,
                    Stump {
                        feature,
                        threshold: 0.5 * (col[i] + col[next]),
                        left: weight(gl, hl),
                        right: weight(gr, hr),
                    },
                ));
            }
        }
    }
    best
}

impl Learner for BoostedStumps {
    fn fit(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<Box<dyn FittedLearner>, DisparityError> {
        if x.rows == 0 {
            return Err(DisparityError::FitFailed(self.name(), "no observations".to_string()));
        }
        validate_positive_float_parameter(self.learning_rate, "learning_rate")?;
        let objective = LogLoss::default();
        let base_score = objective.initial_value(y, sample_weight, PROBABILITY_BOUND);
        let mut yhat = vec![base_score; x.rows];

        let order: Vec<Vec<usize>> = (0..x.cols)
            .map(|j| {
                let col = x.get_col(j);
                let mut idx: Vec<usize> = (0..x.rows).collect();
                idx.sort_by(|a, b| col[*a].total_cmp(&col[*b]));
                idx
            })
            .collect();

        let mut stumps = Vec::with_capacity(self.rounds);
        for _ in 0..self.rounds {
            let (grad, hess) = objective.gradient(y, &yhat, sample_weight);
            let Some((_, mut stump)) = best_split(x, &order, &grad, &hess) else {
                break;
            };
            stump.left *= self.learning_rate;
            stump.right *= self.learning_rate;
            let col = x.get_col(stump.feature);
            yhat.iter_mut().zip(col).for_each(|(p, v)| {
                *p += if *v < stump.threshold { stump.left } else { stump.right };
            });
            stumps.push(stump);
        }

        Ok(Box::new(FittedStumps { base_score, stumps }))
    }

    fn name(&self) -> String {
        "BoostedStumps".to_string()
    }
}

impl FittedLearner for FittedStumps {
    fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
        let mut yhat = vec![self.base_score; x.rows];
        for stump in &self.stumps {
            let col = x.get_col(stump.feature);
            yhat.iter_mut().zip(col).for_each(|(p, v)| {
                *p += if *v < stump.threshold { stump.left } else { stump.right };
            });
        }
        yhat.into_iter().map(expit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::log_loss;

    #[test]
    fn test_stumps_learn_step_function() {
        let n = 200;
        let x: Vec<f64> = (0..n).map(|i| i as f64 / n as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| if i >= n / 2 && i % 10 != 0 { 1.0 } else { 0.0 }).collect();
        let m = Matrix::new(&x, n, 1);

        let fitted = BoostedStumps::new(Some(50), Some(0.3)).fit(&m, &y, None).unwrap();
        let p = fitted.predict(&m);
        assert!(p.iter().all(|v| *v > 0.0 && *v < 1.0));
        assert!(p[0] < 0.2);
        assert!(p[n - 1] > 0.7);

        let mean = vec![y.iter().sum::<f64>() / n as f64; n];
        assert!(log_loss(&y, &p, 1e-6) < log_loss(&y, &mean, 1e-6));
    }

    #[test]
    fn test_stumps_constant_feature() {
        let x = vec![1.0; 6];
        let y = vec![1.0, 0.0, 1.0, 0.0, 1.0, 1.0];
        let m = Matrix::new(&x, 6, 1);
        let fitted = BoostedStumps::new(None, None).fit(&m, &y, None).unwrap();
        let p = fitted.predict(&m);
        assert!((p[0] - 4.0 / 6.0).abs() < 1e-9);
    }
}
