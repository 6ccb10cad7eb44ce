//! IDIE Estimator
//!
//! Entry point of the interventional disparity indirect effect estimator:
//! validates and prepares the data, fits the nuisance models, builds the
//! counterfactual table, targets psi0 and assembles the result.
use crate::causal::config::IdieConfig;
use crate::causal::counterfactual::ExpandedDataset;
use crate::causal::influence::{InfluenceCurve, InitialEstimate};
use crate::causal::nuisance::fit_nuisance_models;
use crate::causal::result::IdieResult;
use crate::causal::targeting::target_psi0;
use crate::data::Dataset;
use crate::errors::DisparityError;
use crate::learner::Algorithm;
use crate::superlearner::ModelSelector;
use log::info;
use serde::{Deserialize, Serialize};

/// Targeted estimator of the interventional disparity indirect effect among the exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdieEstimator {
    pub cfg: IdieConfig,
}

/// Sorted distinct values of a column.
fn distinct_values(values: &[f64]) -> Vec<f64> {
    let mut distinct = values.to_vec();
    distinct.sort_unstable_by(|a, b| a.total_cmp(b));
    distinct.dedup();
    distinct
}

/// Check that `values` takes exactly two values and map them to {0, 1}.
pub fn recode_binary(name: &str, values: &[f64]) -> Result<Vec<f64>, DisparityError> {
    let distinct = distinct_values(values);
    if distinct.len() != 2 {
        return Err(DisparityError::NotBinary(name.to_string(), distinct.len()));
    }
    let (low, high) = (distinct[0], distinct[1]);
    if low == 0.0 && high == 1.0 {
        return Ok(values.to_vec());
    }
    info!("Recoding {}: {} -> 0, {} -> 1.", name, low, high);
    Ok(values.iter().map(|v| if *v == low { 0.0 } else { 1.0 }).collect())
}

/// Build the working copy of `data` holding only the columns the estimator
/// uses, with exposure, mediator and outcome coded as {0, 1}.
pub fn prepare_data(data: &Dataset, cfg: &IdieConfig) -> Result<Dataset, DisparityError> {
    let roles = [&cfg.exposure, &cfg.mediator, &cfg.outcome];
    let mut used: Vec<&String> = roles.to_vec();
    for c in cfg.confounders_a.iter().chain(&cfg.confounders_z).chain(&cfg.confounders_y) {
        if !used.contains(&c) {
            used.push(c);
        }
    }

    let mut prepared = Dataset::new(data.rows());
    for name in used {
        let values = data.column(name)?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DisparityError::NonFinite(name.clone()));
        }
        let values = if roles.contains(&name) {
            recode_binary(name, values)?
        } else {
            values.to_vec()
        };
        prepared.add_column(name.clone(), values)?;
    }
    Ok(prepared)
}

impl IdieEstimator {
    pub fn new(cfg: IdieConfig) -> Self {
        IdieEstimator { cfg }
    }

    /// Fit with the discrete super learner described by the configuration.
    ///
    /// * `data` - Observations; only the configured columns are read.
    pub fn fit(&self, data: &Dataset) -> Result<IdieResult, DisparityError> {
        let selector = self.cfg.super_learner();
        self.fit_with(data, &selector)
    }

    /// Fit with a caller supplied model selector.
    ///
    /// * `data` - Observations; only the configured columns are read.
    /// * `selector` - Procedure that fits each nuisance model.
    pub fn fit_with(&self, data: &Dataset, selector: &dyn ModelSelector) -> Result<IdieResult, DisparityError> {
        let cfg = &self.cfg;
        cfg.validate()?;
        let data = prepare_data(data, cfg)?;
        info!(
            "Estimating the IDIE of {} through {} on {} for {} observations.",
            cfg.exposure,
            cfg.mediator,
            cfg.outcome,
            data.rows()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(cfg.num_threads.unwrap_or(0))
            .build()
            .map_err(|e| {
                DisparityError::InvalidParameter(
                    "num_threads".to_string(),
                    "a thread count the pool can be built with".to_string(),
                    e.to_string(),
                )
            })?;
        let models = pool.install(|| fit_nuisance_models(&data, cfg, selector))?;

        let mut expanded = ExpandedDataset::build(&data, cfg, &models)?;
        let observed = expanded.observed();
        let initial = InitialEstimate::new(&expanded, &observed);
        info!(
            "Initial estimates: psi0 {:.6}, psi1 {:.6}, se0 {:.6}.",
            initial.psi0, initial.psi1, initial.se0
        );

        let targeted = target_psi0(
            &mut expanded,
            &observed,
            &initial,
            cfg.max_iterations,
            cfg.probability_bound,
        )?;
        let targeted_curve = cfg
            .recompute_se
            .then(|| InfluenceCurve::new(&expanded, &observed, initial.pibar, targeted.psi0, initial.psi1));

        let result = IdieResult::assemble(
            targeted.psi0,
            &initial,
            targeted_curve,
            &models,
            expanded,
            &observed,
            targeted.convergence,
        );
        info!(
            "Targeted estimates: psi0 {:.6}, psi1 {:.6}, psi {:.6} (se {:.6}).",
            result.estimate.psi0, result.estimate.psi1, result.estimate.psi, result.se.se_diff
        );
        Ok(result)
    }
}

/// Estimate the IDIE among the exposed with the default super learner.
///
/// * `data` - Observations.
/// * `exposure`, `mediator`, `outcome` - Binary columns.
/// * `confounders_a`, `confounders_z`, `confounders_y` - Confounders of each
///   model, excluding exposure, mediator and outcome.
/// * `library_a`, `library_z`, `library_y` - Candidate algorithms of each model.
/// * `max_iterations` - Cap of the targeting loop.
#[allow(clippy::too_many_arguments)]
pub fn estimate_idie_exposed(
    data: &Dataset,
    exposure: &str,
    mediator: &str,
    outcome: &str,
    confounders_a: &[&str],
    confounders_z: &[&str],
    confounders_y: &[&str],
    library_a: &[Algorithm],
    library_z: &[Algorithm],
    library_y: &[Algorithm],
    max_iterations: usize,
) -> Result<IdieResult, DisparityError> {
    let names = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    IdieEstimator::default()
        .set_exposure(exposure)
        .set_mediator(mediator)
        .set_outcome(outcome)
        .set_confounders_a(names(confounders_a))
        .set_confounders_z(names(confounders_z))
        .set_confounders_y(names(confounders_y))
        .set_library_a(library_a.to_vec())
        .set_library_z(library_z.to_vec())
        .set_library_y(library_y.to_vec())
        .set_max_iterations(max_iterations)
        .fit(data)
}
