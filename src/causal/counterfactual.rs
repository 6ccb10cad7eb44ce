//! Counterfactual Prediction Builder
//!
//! Expands every observation into two rows, one with the mediator set to 0
//! and one with it set to 1, and fills each row with nuisance predictions
//! under the observed and forced exposure/mediator settings.
//!
//! Rows `0..n` hold the `Z = 0` replica and rows `n..2n` the `Z = 1`
//! replica, both in observation order. Only the replica whose `z` equals
//! `z_obs` enters estimating equations; the other one exists to carry the
//! counterfactual outcome predictions.
use crate::causal::config::IdieConfig;
use crate::causal::nuisance::NuisanceModels;
use crate::data::Dataset;
use crate::errors::DisparityError;
use crate::utils::bound_probability;
use serde::{Deserialize, Serialize};

/// Expanded, annotated analysis table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpandedDataset {
    /// Observation index in the input dataset.
    pub id: Vec<usize>,
    /// Observed exposure.
    pub a: Vec<f64>,
    /// Mediator value of this replica.
    pub z: Vec<f64>,
    /// Observed mediator.
    pub z_obs: Vec<f64>,
    /// Observed outcome.
    pub y: Vec<f64>,
    /// `P(A = 1 | W)`.
    pub pihat: Vec<f64>,
    /// `P(Z = 1 | W, A)` at the observed exposure.
    pub gammahat: Vec<f64>,
    /// `P(Z = 1 | W, A = 0)`.
    pub gammahat_a0: Vec<f64>,
    /// `P(Z = 1 | W, A = 1)`.
    pub gammahat_a1: Vec<f64>,
    /// `P(Y = 1 | W, A, Z)` at the observed exposure and this replica's mediator.
    pub qhat: Vec<f64>,
    /// `P(Y = 1 | W, A = 1, Z)` at this replica's mediator.
    pub qhat_a1: Vec<f64>,
    /// `P(Y = 1 | W, A = 1, Z = 0)`.
    pub qhat_a1_z0: Vec<f64>,
    /// `P(Y = 1 | W, A = 1, Z = 1)`.
    pub qhat_a1_z1: Vec<f64>,
    /// Outcome risk under exposure with the exposed mediator distribution.
    pub psi_1: Vec<f64>,
    /// Outcome risk under exposure with the unexposed mediator distribution.
    pub psi_0: Vec<f64>,
}

fn stack(first: &[f64], second: &[f64]) -> Vec<f64> {
    let mut v = Vec::with_capacity(first.len() + second.len());
    v.extend_from_slice(first);
    v.extend_from_slice(second);
    v
}

fn bounded(values: Vec<f64>, bound: f64) -> Vec<f64> {
    values.into_iter().map(|p| bound_probability(p, bound)).collect()
}

impl ExpandedDataset {
    /// Build the expanded table from `data` and the fitted models.
    ///
    /// Every prediction is made on a fresh design with only the forced
    /// columns replaced; `data` is not modified.
    pub fn build(data: &Dataset, cfg: &IdieConfig, models: &NuisanceModels) -> Result<Self, DisparityError> {
        let n = data.rows();
        let bound = cfg.probability_bound;
        let exposure = cfg.exposure.as_str();
        let mediator = cfg.mediator.as_str();

        let a = data.column(exposure)?;
        let z_obs = data.column(mediator)?;
        let y = data.column(&cfg.outcome)?;

        let pihat = bounded(models.exposure.predict_dataset(data, &[])?, bound);

        let gammahat = bounded(models.mediator.predict_dataset(data, &[])?, bound);
        let gammahat_a0 = bounded(models.mediator.predict_dataset(data, &[(exposure, 0.0)])?, bound);
        let gammahat_a1 = bounded(models.mediator.predict_dataset(data, &[(exposure, 1.0)])?, bound);

        let qhat_z0 = bounded(models.outcome.predict_dataset(data, &[(mediator, 0.0)])?, bound);
        let qhat_z1 = bounded(models.outcome.predict_dataset(data, &[(mediator, 1.0)])?, bound);
        let qhat_a1_z0 = bounded(
            models.outcome.predict_dataset(data, &[(exposure, 1.0), (mediator, 0.0)])?,
            bound,
        );
        let qhat_a1_z1 = bounded(
            models.outcome.predict_dataset(data, &[(exposure, 1.0), (mediator, 1.0)])?,
            bound,
        );

        let mut expanded = ExpandedDataset {
            id: (0..n).chain(0..n).collect(),
            a: stack(a, a),
            z: stack(&vec![0.0; n], &vec![1.0; n]),
            z_obs: stack(z_obs, z_obs),
            y: stack(y, y),
            pihat: stack(&pihat, &pihat),
            gammahat: stack(&gammahat, &gammahat),
            gammahat_a0: stack(&gammahat_a0, &gammahat_a0),
            gammahat_a1: stack(&gammahat_a1, &gammahat_a1),
            qhat: stack(&qhat_z0, &qhat_z1),
            qhat_a1: stack(&qhat_a1_z0, &qhat_a1_z1),
            qhat_a1_z0: stack(&qhat_a1_z0, &qhat_a1_z0),
            qhat_a1_z1: stack(&qhat_a1_z1, &qhat_a1_z1),
            psi_1: vec![0.0; 2 * n],
            psi_0: vec![0.0; 2 * n],
        };
        expanded.update_psi();
        Ok(expanded)
    }

    /// Number of expanded rows, twice the number of observations.
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }

    /// Rows whose mediator replica matches the observed mediator, one per
    /// observation, in observation order.
    pub fn observed(&self) -> Vec<usize> {
        let mut rows: Vec<usize> = (0..self.len()).filter(|&i| self.z[i] == self.z_obs[i]).collect();
        rows.sort_by_key(|&i| self.id[i]);
        rows
    }

    /// Recompute `psi_1` and `psi_0` from the current mediator and outcome predictions.
    pub fn update_psi(&mut self) {
        for i in 0..self.len() {
            let (q0, q1) = (self.qhat_a1_z0[i], self.qhat_a1_z1[i]);
            self.psi_1[i] = q1 * self.gammahat_a1[i] + q0 * (1.0 - self.gammahat_a1[i]);
            self.psi_0[i] = q1 * self.gammahat_a0[i] + q0 * (1.0 - self.gammahat_a0[i]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Matrix;
    use crate::learner::FittedLearner;
    use crate::superlearner::{NuisanceModel, NuisanceRole};

    /// Predicts `expit(sum of coefficient * column)` with fixed coefficients.
    struct Linear(Vec<f64>);

    impl FittedLearner for Linear {
        fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
            (0..x.rows)
                .map(|i| {
                    let eta: f64 = self.0.iter().enumerate().map(|(j, b)| b * x.get(i, j)).sum();
                    crate::utils::expit(eta)
                })
                .collect()
        }
    }

    fn model(role: NuisanceRole, covariates: Vec<String>, coef: Vec<f64>) -> NuisanceModel {
        NuisanceModel::new(role, covariates, "Fixed".to_string(), Vec::new(), Box::new(Linear(coef)))
    }

    fn fixture() -> (Dataset, IdieConfig, NuisanceModels) {
        let data = Dataset::from_columns(vec![
            ("w", vec![0.5, -0.5, 1.0]),
            ("A", vec![1.0, 0.0, 1.0]),
            ("Z", vec![0.0, 1.0, 1.0]),
            ("Y", vec![1.0, 0.0, 0.0]),
        ])
        .unwrap();
        let cfg = IdieConfig {
            confounders_a: vec!["w".to_string()],
            confounders_z: vec!["w".to_string()],
            confounders_y: vec!["w".to_string()],
            ..Default::default()
        };
        let models = NuisanceModels {
            exposure: model(NuisanceRole::Exposure, cfg.covariates(NuisanceRole::Exposure), vec![1.0]),
            mediator: model(NuisanceRole::Mediator, cfg.covariates(NuisanceRole::Mediator), vec![0.5, -1.0]),
            outcome: model(NuisanceRole::Outcome, cfg.covariates(NuisanceRole::Outcome), vec![0.2, 0.7, -1.2]),
        };
        (data, cfg, models)
    }

    #[test]
    fn test_expanded_layout() {
        let (data, cfg, models) = fixture();
        let ex = ExpandedDataset::build(&data, &cfg, &models).unwrap();
        assert_eq!(ex.len(), 6);
        assert_eq!(ex.id, vec![0, 1, 2, 0, 1, 2]);
        assert_eq!(ex.z, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        // observation 0 has Z = 0, observations 1 and 2 have Z = 1
        assert_eq!(ex.observed(), vec![0, 4, 5]);
        // the input table is left untouched
        assert_eq!(data.column("A").unwrap(), &[1.0, 0.0, 1.0]);
        assert_eq!(data.column("Z").unwrap(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_counterfactual_predictions() {
        let (data, cfg, models) = fixture();
        let ex = ExpandedDataset::build(&data, &cfg, &models).unwrap();
        let expit = crate::utils::expit;

        // observation 1: w = -0.5, A = 0
        let w = -0.5;
        assert!((ex.pihat[1] - expit(w)).abs() < 1e-12);
        assert!((ex.gammahat[1] - expit(0.5 * w)).abs() < 1e-12);
        assert!((ex.gammahat_a0[1] - expit(0.5 * w)).abs() < 1e-12);
        assert!((ex.gammahat_a1[1] - expit(0.5 * w - 1.0)).abs() < 1e-12);
        // replica Z = 1 of observation 1 is row 4
        assert!((ex.qhat[4] - expit(0.2 * w - 1.2)).abs() < 1e-12);
        assert!((ex.qhat[1] - expit(0.2 * w)).abs() < 1e-12);
        assert!((ex.qhat_a1[4] - expit(0.2 * w + 0.7 - 1.2)).abs() < 1e-12);
        assert_eq!(ex.qhat_a1[1], ex.qhat_a1_z0[1]);
        assert_eq!(ex.qhat_a1[4], ex.qhat_a1_z1[4]);
        assert_eq!(ex.qhat_a1_z0[1], ex.qhat_a1_z0[4]);

        let psi_0 = ex.qhat_a1_z1[1] * ex.gammahat_a0[1] + ex.qhat_a1_z0[1] * (1.0 - ex.gammahat_a0[1]);
        assert!((ex.psi_0[1] - psi_0).abs() < 1e-15);
        assert_eq!(ex.psi_0[1], ex.psi_0[4]);
    }
}
