//! Nuisance Model Fitter
//!
//! Fits the exposure, mediator and outcome regressions once, through a
//! [`ModelSelector`]. The three fits are independent and run concurrently.
use crate::causal::config::IdieConfig;
use crate::data::Dataset;
use crate::errors::DisparityError;
use crate::superlearner::{ModelSelector, NuisanceModel, NuisanceRole};
use log::info;

/// The three fitted regressions. Immutable after fitting: the targeting step
/// fluctuates their predictions, never the models.
#[derive(Debug)]
pub struct NuisanceModels {
    /// `P(A = 1 | confounders_a)`.
    pub exposure: NuisanceModel,
    /// `P(Z = 1 | confounders_z, A)`.
    pub mediator: NuisanceModel,
    /// `P(Y = 1 | confounders_y, A, Z)`.
    pub outcome: NuisanceModel,
}

fn fit_role(
    data: &Dataset,
    cfg: &IdieConfig,
    selector: &dyn ModelSelector,
    role: NuisanceRole,
) -> Result<NuisanceModel, DisparityError> {
    let covariates = cfg.covariates(role);
    info!("Fitting the {} model on {} covariates.", role, covariates.len());
    selector.fit(role, data, cfg.target(role), &covariates, cfg.library(role))
}

/// Fit all three nuisance models on `data`.
pub fn fit_nuisance_models(
    data: &Dataset,
    cfg: &IdieConfig,
    selector: &dyn ModelSelector,
) -> Result<NuisanceModels, DisparityError> {
    let (exposure, (mediator, outcome)) = rayon::join(
        || fit_role(data, cfg, selector, NuisanceRole::Exposure),
        || {
            rayon::join(
                || fit_role(data, cfg, selector, NuisanceRole::Mediator),
                || fit_role(data, cfg, selector, NuisanceRole::Outcome),
            )
        },
    );
    Ok(NuisanceModels {
        exposure: exposure?,
        mediator: mediator?,
        outcome: outcome?,
    })
}
