//! Variance & Reporting
//!
//! The immutable result of one IDIE fit.
use crate::causal::counterfactual::ExpandedDataset;
use crate::causal::influence::{InfluenceCurve, InitialEstimate};
use crate::causal::nuisance::NuisanceModels;
use crate::causal::targeting::{Convergence, LoopState};
use crate::constants::Z_975;
use crate::errors::DisparityError;
use crate::superlearner::CvRisk;
use crate::utils::Summary;
use serde::{Deserialize, Serialize};

/// Counterfactual risks among the exposed and their difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimates {
    /// Risk under the unexposed mediator distribution.
    pub psi0: f64,
    /// Observed risk.
    pub psi1: f64,
    /// `psi0 - psi1`, the IDIE among the exposed.
    pub psi: f64,
}

impl Estimates {
    pub fn new(psi0: f64, psi1: f64) -> Self {
        Estimates {
            psi0,
            psi1,
            psi: psi0 - psi1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardErrors {
    pub se0: f64,
    pub se1: f64,
    pub se_diff: f64,
}

/// Wald interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn wald(estimate: f64, se: f64) -> Self {
        Interval {
            lower: estimate - Z_975 * se,
            upper: estimate + Z_975 * se,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

/// 95% confidence intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceIntervals {
    pub psi0: Interval,
    pub psi1: Interval,
    pub psi: Interval,
}

impl ConfidenceIntervals {
    pub fn new(estimate: &Estimates, se: &StandardErrors) -> Self {
        ConfidenceIntervals {
            psi0: Interval::wald(estimate.psi0, se.se0),
            psi1: Interval::wald(estimate.psi1, se.se1),
            psi: Interval::wald(estimate.psi, se.se_diff),
        }
    }
}

/// One value per nuisance model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTable<T> {
    pub exposure: T,
    pub mediator: T,
    pub outcome: T,
}

/// Summary of one prediction column over the exposed observed rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub column: String,
    pub summary: Summary,
}

/// Summaries of the key prediction columns on the exposed, observed-mediator rows.
pub fn distributions(ex: &ExpandedDataset, observed: &[usize]) -> Vec<Distribution> {
    let exposed: Vec<usize> = observed.iter().copied().filter(|&i| ex.a[i] == 1.0).collect();
    let columns: [(&str, &[f64]); 7] = [
        ("pihat", &ex.pihat),
        ("gammahat_a0", &ex.gammahat_a0),
        ("gammahat_a1", &ex.gammahat_a1),
        ("qhat_a1_z0", &ex.qhat_a1_z0),
        ("qhat_a1_z1", &ex.qhat_a1_z1),
        ("psi_0", &ex.psi_0),
        ("psi_1", &ex.psi_1),
    ];
    columns
        .iter()
        .map(|(name, values)| {
            let selected: Vec<f64> = exposed.iter().map(|&i| values[i]).collect();
            Distribution {
                column: name.to_string(),
                summary: Summary::new(&selected),
            }
        })
        .collect()
}

/// Result of [`IdieEstimator::fit`](super::idie::IdieEstimator::fit).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdieResult {
    /// Targeted estimates.
    pub estimate: Estimates,
    /// Un-targeted plug-in estimates.
    pub initial: Estimates,
    pub se: StandardErrors,
    pub ci: ConfidenceIntervals,
    /// Cross-validated risk of every candidate, per model.
    pub cv_risk: ModelTable<Vec<CvRisk>>,
    /// Selected algorithm per model.
    pub discrete_algorithm: ModelTable<String>,
    pub distributions: Vec<Distribution>,
    /// Expanded table with the final targeted predictions.
    pub augmented_dataset: ExpandedDataset,
    pub convergence: Convergence,
    /// Empirical probability of exposure.
    pub pibar: f64,
    /// Number of observations.
    pub n: usize,
}

impl IdieResult {
    /// Assemble the result.
    ///
    /// Standard errors come from the initial influence curve unless
    /// `targeted_curve` is given.
    pub(crate) fn assemble(
        psi0: f64,
        initial: &InitialEstimate,
        targeted_curve: Option<InfluenceCurve>,
        models: &NuisanceModels,
        augmented_dataset: ExpandedDataset,
        observed: &[usize],
        convergence: Convergence,
    ) -> Self {
        let estimate = Estimates::new(psi0, initial.psi1);
        let (se0, se1, se_diff) = match targeted_curve {
            Some(curve) => curve.standard_errors(),
            None => (initial.se0, initial.se1, initial.se_diff),
        };
        let se = StandardErrors { se0, se1, se_diff };
        IdieResult {
            estimate,
            initial: Estimates::new(initial.psi0, initial.psi1),
            ci: ConfidenceIntervals::new(&estimate, &se),
            se,
            cv_risk: ModelTable {
                exposure: models.exposure.cv_risks.clone(),
                mediator: models.mediator.cv_risks.clone(),
                outcome: models.outcome.cv_risks.clone(),
            },
            discrete_algorithm: ModelTable {
                exposure: models.exposure.selected_algorithm_name.clone(),
                mediator: models.mediator.selected_algorithm_name.clone(),
                outcome: models.outcome.selected_algorithm_name.clone(),
            },
            distributions: distributions(&augmented_dataset, observed),
            augmented_dataset,
            convergence,
            pibar: initial.pibar,
            n: observed.len(),
        }
    }

    /// Whether the targeting loop met its tolerance.
    pub fn converged(&self) -> bool {
        self.convergence.state == LoopState::Converged
    }

    /// Summary of one prediction column, if it is reported.
    pub fn distribution(&self, column: &str) -> Option<&Summary> {
        self.distributions.iter().find(|d| d.column == column).map(|d| &d.summary)
    }

    /// Dump as a json object.
    pub fn json_dump(&self) -> Result<String, DisparityError> {
        serde_json::to_string(self).map_err(|e| DisparityError::UnableToWrite(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wald_interval() {
        let estimate = Estimates::new(0.2, 0.3);
        assert!((estimate.psi + 0.1).abs() < 1e-15);
        let se = StandardErrors {
            se0: 0.01,
            se1: 0.0,
            se_diff: 0.02,
        };
        let ci = ConfidenceIntervals::new(&estimate, &se);
        assert!((ci.psi0.lower - (0.2 - 1.959963984540054 * 0.01)).abs() < 1e-15);
        assert_eq!(ci.psi1.lower, ci.psi1.upper);
        assert!(ci.psi.contains(-0.1));
        assert!(!ci.psi.contains(0.0));
    }

    #[test]
    fn test_distributions_use_exposed_observed_rows() {
        let ex = ExpandedDataset {
            id: vec![0, 1, 0, 1],
            a: vec![1.0, 0.0, 1.0, 0.0],
            z: vec![0.0, 0.0, 1.0, 1.0],
            z_obs: vec![0.0, 1.0, 0.0, 1.0],
            y: vec![0.0; 4],
            pihat: vec![0.7, 0.2, 0.9, 0.1],
            gammahat: vec![0.5; 4],
            gammahat_a0: vec![0.5; 4],
            gammahat_a1: vec![0.5; 4],
            qhat: vec![0.5; 4],
            qhat_a1: vec![0.5; 4],
            qhat_a1_z0: vec![0.5; 4],
            qhat_a1_z1: vec![0.5; 4],
            psi_1: vec![0.5; 4],
            psi_0: vec![0.5; 4],
        };
        let d = distributions(&ex, &ex.observed());
        assert_eq!(d.len(), 7);
        assert_eq!(d[0].column, "pihat");
        // only row 0 is exposed and observed
        assert_eq!(d[0].summary.min, 0.7);
        assert_eq!(d[0].summary.max, 0.7);
    }
}
