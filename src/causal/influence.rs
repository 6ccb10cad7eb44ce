//! Initial Estimator & Influence Curves
//!
//! Plug-in estimates of the two counterfactual risks among the exposed and
//! the efficient influence curve values used for variance estimation and as
//! the convergence statistic of the targeting loop.
//!
//! With `g(z | a, W)` the mediator density and `pibar = P(A = 1)`:
//!
//! ```text
//! eic0 = A / pibar * g(Z|0,W) / g(Z|1,W) * (Y - Q(A, Z, W))
//!      + (1 - A) / (1 - pi(W)) * pi(W) / pibar * (Q(1, Z, W) - psi_0(W))
//!      + A / pibar * (psi_0(W) - psi0)
//! eic1 = A / pibar * (Y - psi1)
//! ```
use crate::causal::counterfactual::ExpandedDataset;
use serde::{Deserialize, Serialize};

/// `P(Z = z | ...)` from `P(Z = 1 | ...)`.
#[inline]
pub fn mediator_density(z: f64, gamma: f64) -> f64 {
    z * gamma + (1.0 - z) * (1.0 - gamma)
}

/// Outcome clever weight: exposed indicator over `pibar` times the ratio of
/// unexposed to exposed mediator densities at the row's mediator.
#[inline]
pub fn outcome_weight(ex: &ExpandedDataset, i: usize, pibar: f64) -> f64 {
    let ratio = mediator_density(ex.z[i], ex.gammahat_a0[i]) / mediator_density(ex.z[i], ex.gammahat_a1[i]);
    ex.a[i] / pibar * ratio
}

/// Mediator clever weight: unexposed indicator reweighted to the exposed.
#[inline]
pub fn mediator_weight(ex: &ExpandedDataset, i: usize, pibar: f64) -> f64 {
    (1.0 - ex.a[i]) / (1.0 - ex.pihat[i]) * ex.pihat[i] / pibar
}

/// Mediator clever covariate: effect of the mediator on the exposed outcome risk.
#[inline]
pub fn mediator_covariate(ex: &ExpandedDataset, i: usize) -> f64 {
    ex.qhat_a1_z1[i] - ex.qhat_a1_z0[i]
}

/// Empirical marginal probability of exposure.
pub fn exposure_prevalence(ex: &ExpandedDataset, observed: &[usize]) -> f64 {
    observed.iter().map(|&i| ex.a[i]).sum::<f64>() / observed.len() as f64
}

/// `psi0 = mean(A * psi_0) / pibar` over observed rows.
pub fn psi0_estimate(ex: &ExpandedDataset, observed: &[usize], pibar: f64) -> f64 {
    let n = observed.len() as f64;
    observed.iter().map(|&i| ex.a[i] * ex.psi_0[i]).sum::<f64>() / n / pibar
}

/// Mean outcome among the exposed.
pub fn psi1_estimate(ex: &ExpandedDataset, observed: &[usize]) -> f64 {
    let (total, count) = observed
        .iter()
        .filter(|&&i| ex.a[i] == 1.0)
        .fold((0.0, 0.0), |(t, c), &i| (t + ex.y[i], c + 1.0));
    total / count
}

/// `eic0` of one observed row.
#[inline]
pub fn eic0_row(ex: &ExpandedDataset, i: usize, pibar: f64, psi0: f64) -> f64 {
    outcome_weight(ex, i, pibar) * (ex.y[i] - ex.qhat[i])
        + mediator_weight(ex, i, pibar) * (ex.qhat_a1[i] - ex.psi_0[i])
        + ex.a[i] / pibar * (ex.psi_0[i] - psi0)
}

/// `eic0` for every observed row.
pub fn eic0(ex: &ExpandedDataset, observed: &[usize], pibar: f64, psi0: f64) -> Vec<f64> {
    observed.iter().map(|&i| eic0_row(ex, i, pibar, psi0)).collect()
}

/// `eic1` for every observed row.
pub fn eic1(ex: &ExpandedDataset, observed: &[usize], pibar: f64, psi1: f64) -> Vec<f64> {
    observed.iter().map(|&i| ex.a[i] / pibar * (ex.y[i] - psi1)).collect()
}

/// `sqrt(mean(eic^2) / n)`.
pub fn standard_error(eic: &[f64]) -> f64 {
    let n = eic.len() as f64;
    (eic.iter().map(|v| v * v).sum::<f64>() / n / n).sqrt()
}

/// Influence curves of psi0, psi1 and their difference, one value per observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfluenceCurve {
    pub eic0: Vec<f64>,
    pub eic1: Vec<f64>,
    pub eic: Vec<f64>,
}

impl InfluenceCurve {
    pub fn new(ex: &ExpandedDataset, observed: &[usize], pibar: f64, psi0: f64, psi1: f64) -> Self {
        let eic0 = eic0(ex, observed, pibar, psi0);
        let eic1 = eic1(ex, observed, pibar, psi1);
        let eic = eic0.iter().zip(&eic1).map(|(e0, e1)| e0 - e1).collect();
        InfluenceCurve { eic0, eic1, eic }
    }

    /// Standard errors `(se0, se1, se_diff)`.
    pub fn standard_errors(&self) -> (f64, f64, f64) {
        (
            standard_error(&self.eic0),
            standard_error(&self.eic1),
            standard_error(&self.eic),
        )
    }
}

/// Un-targeted estimates and their influence curve.
#[derive(Debug, Clone)]
pub struct InitialEstimate {
    pub pibar: f64,
    pub psi0: f64,
    pub psi1: f64,
    pub curve: InfluenceCurve,
    pub se0: f64,
    pub se1: f64,
    pub se_diff: f64,
}

impl InitialEstimate {
    pub fn new(ex: &ExpandedDataset, observed: &[usize]) -> Self {
        let pibar = exposure_prevalence(ex, observed);
        let psi0 = psi0_estimate(ex, observed, pibar);
        let psi1 = psi1_estimate(ex, observed);
        let curve = InfluenceCurve::new(ex, observed, pibar, psi0, psi1);
        let (se0, se1, se_diff) = curve.standard_errors();
        InitialEstimate {
            pibar,
            psi0,
            psi1,
            curve,
            se0,
            se1,
            se_diff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two observations, hand-set predictions.
    fn two_rows() -> ExpandedDataset {
        let mut ex = ExpandedDataset {
            id: vec![0, 1, 0, 1],
            a: vec![1.0, 0.0, 1.0, 0.0],
            z: vec![0.0, 0.0, 1.0, 1.0],
            z_obs: vec![1.0, 0.0, 1.0, 0.0],
            y: vec![1.0, 0.0, 1.0, 0.0],
            pihat: vec![0.6, 0.4, 0.6, 0.4],
            gammahat: vec![0.5, 0.3, 0.5, 0.3],
            gammahat_a0: vec![0.3, 0.3, 0.3, 0.3],
            gammahat_a1: vec![0.5, 0.6, 0.5, 0.6],
            qhat: vec![0.4, 0.2, 0.3, 0.1],
            qhat_a1: vec![0.4, 0.5, 0.3, 0.25],
            qhat_a1_z0: vec![0.4, 0.5, 0.4, 0.5],
            qhat_a1_z1: vec![0.3, 0.25, 0.3, 0.25],
            psi_1: vec![0.0; 4],
            psi_0: vec![0.0; 4],
        };
        ex.update_psi();
        ex
    }

    #[test]
    fn test_initial_estimate_by_hand() {
        let ex = two_rows();
        let observed = ex.observed();
        assert_eq!(observed, vec![2, 1]);

        let init = InitialEstimate::new(&ex, &observed);
        assert_eq!(init.pibar, 0.5);
        // psi_0 of observation 0: 0.3 * 0.3 + 0.4 * 0.7 = 0.37
        assert!((ex.psi_0[2] - 0.37).abs() < 1e-12);
        assert!((init.psi0 - 0.37).abs() < 1e-12);
        assert_eq!(init.psi1, 1.0);

        // observation 0 (row 2): exposed, Z = 1, Y = 1
        // outcome term: 2 * (0.3 / 0.5) * (1 - 0.3) = 0.84, centering term 0
        assert!((init.curve.eic0[0] - 0.84).abs() < 1e-12);
        // observation 1 (row 1): unexposed, Z = 0
        // psi_0 = 0.25 * 0.3 + 0.5 * 0.7 = 0.425
        // mediator term: 1 / 0.6 * 0.4 / 0.5 * (0.5 - 0.425) = 0.1
        assert!((init.curve.eic0[1] - 0.1).abs() < 1e-12);

        assert_eq!(init.curve.eic1, vec![0.0, 0.0]);
        assert!((init.curve.eic[0] - 0.84).abs() < 1e-12);

        let se0 = ((0.84_f64 * 0.84 + 0.1 * 0.1) / 2.0 / 2.0).sqrt();
        assert!((init.se0 - se0).abs() < 1e-12);
        assert_eq!(init.se1, 0.0);
        assert!(init.se_diff >= 0.0);
    }

    #[test]
    fn test_mediator_density() {
        assert_eq!(mediator_density(1.0, 0.3), 0.3);
        assert!((mediator_density(0.0, 0.3) - 0.7).abs() < 1e-15);
    }
}
