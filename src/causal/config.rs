//! Estimator Configuration
//!
//! Variable roles, learner libraries and numerical settings of the IDIE
//! estimator, with JSON persistence.
use crate::constants::{CV_FOLDS, MAX_ITERATIONS, PROBABILITY_BOUND};
use crate::errors::DisparityError;
use crate::learner::Algorithm;
use crate::metric::Metric;
use crate::superlearner::{DiscreteSuperLearner, NuisanceRole};
use crate::utils::validate_float_parameter;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_exposure() -> String {
    "A".to_string()
}
fn default_mediator() -> String {
    "Z".to_string()
}
fn default_outcome() -> String {
    "Y".to_string()
}
fn default_library() -> Vec<Algorithm> {
    vec![Algorithm::Mean, Algorithm::Glm]
}
fn default_max_iterations() -> usize {
    MAX_ITERATIONS
}
fn default_cv_folds() -> usize {
    CV_FOLDS
}
fn default_probability_bound() -> f64 {
    PROBABILITY_BOUND
}

/// Configuration for the [`IdieEstimator`](super::idie::IdieEstimator).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdieConfig {
    /// Binary exposure column.
    #[serde(default = "default_exposure")]
    pub exposure: String,
    /// Binary mediator column.
    #[serde(default = "default_mediator")]
    pub mediator: String,
    /// Binary outcome column.
    #[serde(default = "default_outcome")]
    pub outcome: String,
    /// Confounders of the exposure model.
    #[serde(default)]
    pub confounders_a: Vec<String>,
    /// Confounders of the mediator model; the exposure is added automatically.
    #[serde(default)]
    pub confounders_z: Vec<String>,
    /// Confounders of the outcome model; exposure and mediator are added automatically.
    #[serde(default)]
    pub confounders_y: Vec<String>,
    /// Candidate algorithms for the exposure model.
    #[serde(default = "default_library")]
    pub library_a: Vec<Algorithm>,
    /// Candidate algorithms for the mediator model.
    #[serde(default = "default_library")]
    pub library_z: Vec<Algorithm>,
    /// Candidate algorithms for the outcome model.
    #[serde(default = "default_library")]
    pub library_y: Vec<Algorithm>,
    /// Iteration cap of the targeting loop.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Cross-validation folds of the super learner.
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Balance outcome levels across folds.
    #[serde(default)]
    pub stratify_cv: bool,
    /// Risk used to select candidates.
    #[serde(default)]
    pub metric: Metric,
    /// Seed of the fold assignment.
    #[serde(default)]
    pub seed: u64,
    /// Predicted probabilities are clipped into `[bound, 1 - bound]`.
    #[serde(default = "default_probability_bound")]
    pub probability_bound: f64,
    /// Recompute standard errors from the targeted influence curve instead of
    /// the initial one.
    #[serde(default)]
    pub recompute_se: bool,
    /// Number of threads used to fit nuisance models. All cores when `None`.
    #[serde(default)]
    pub num_threads: Option<usize>,
}

impl Default for IdieConfig {
    fn default() -> Self {
        IdieConfig {
            exposure: default_exposure(),
            mediator: default_mediator(),
            outcome: default_outcome(),
            confounders_a: Vec::new(),
            confounders_z: Vec::new(),
            confounders_y: Vec::new(),
            library_a: default_library(),
            library_z: default_library(),
            library_y: default_library(),
            max_iterations: MAX_ITERATIONS,
            cv_folds: CV_FOLDS,
            stratify_cv: false,
            metric: Metric::default(),
            seed: 0,
            probability_bound: PROBABILITY_BOUND,
            recompute_se: false,
            num_threads: None,
        }
    }
}

impl IdieConfig {
    /// Candidate library of one nuisance model.
    pub fn library(&self, role: NuisanceRole) -> &[Algorithm] {
        match role {
            NuisanceRole::Exposure => &self.library_a,
            NuisanceRole::Mediator => &self.library_z,
            NuisanceRole::Outcome => &self.library_y,
        }
    }

    /// Covariates of one nuisance model, in design order.
    pub fn covariates(&self, role: NuisanceRole) -> Vec<String> {
        match role {
            NuisanceRole::Exposure => self.confounders_a.clone(),
            NuisanceRole::Mediator => {
                let mut c = self.confounders_z.clone();
                c.push(self.exposure.clone());
                c
            }
            NuisanceRole::Outcome => {
                let mut c = self.confounders_y.clone();
                c.push(self.exposure.clone());
                c.push(self.mediator.clone());
                c
            }
        }
    }

    /// Target column of one nuisance model.
    pub fn target(&self, role: NuisanceRole) -> &str {
        match role {
            NuisanceRole::Exposure => &self.exposure,
            NuisanceRole::Mediator => &self.mediator,
            NuisanceRole::Outcome => &self.outcome,
        }
    }

    /// Super learner matching these settings.
    pub fn super_learner(&self) -> DiscreteSuperLearner {
        DiscreteSuperLearner {
            folds: self.cv_folds,
            stratify: self.stratify_cv,
            seed: self.seed,
            metric: self.metric,
            probability_bound: self.probability_bound,
        }
    }

    /// Check settings that do not depend on the data.
    pub fn validate(&self) -> Result<(), DisparityError> {
        if self.max_iterations == 0 {
            return Err(DisparityError::InvalidParameter(
                "max_iterations".to_string(),
                "a value of at least 1".to_string(),
                self.max_iterations.to_string(),
            ));
        }
        if self.cv_folds < 2 {
            return Err(DisparityError::InvalidParameter(
                "cv_folds".to_string(),
                "a value of at least 2".to_string(),
                self.cv_folds.to_string(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(DisparityError::InvalidParameter(
                "num_threads".to_string(),
                "a positive thread count".to_string(),
                "0".to_string(),
            ));
        }
        validate_float_parameter(self.probability_bound, 0.0, 0.5, "probability_bound")?;
        if self.probability_bound == 0.0 || self.probability_bound == 0.5 {
            return Err(DisparityError::InvalidParameter(
                "probability_bound".to_string(),
                "a value strictly between 0 and 0.5".to_string(),
                self.probability_bound.to_string(),
            ));
        }

        let roles = [
            (&self.exposure, "exposure"),
            (&self.mediator, "mediator"),
            (&self.outcome, "outcome"),
        ];
        if self.exposure == self.mediator || self.exposure == self.outcome || self.mediator == self.outcome {
            return Err(DisparityError::InvalidParameter(
                "exposure, mediator, outcome".to_string(),
                "three distinct variables".to_string(),
                format!("{}, {}, {}", self.exposure, self.mediator, self.outcome),
            ));
        }
        for confounders in [&self.confounders_a, &self.confounders_z, &self.confounders_y] {
            for c in confounders {
                if let Some((name, role)) = roles.iter().find(|(name, _)| *name == c) {
                    return Err(DisparityError::DuplicateVariable(name.to_string(), role.to_string()));
                }
            }
        }

        for role in [NuisanceRole::Exposure, NuisanceRole::Mediator, NuisanceRole::Outcome] {
            if self.library(role).is_empty() {
                return Err(DisparityError::EmptyLibrary(role.to_string()));
            }
        }
        Ok(())
    }
}

/// IO
pub trait ConfigIO: Serialize + DeserializeOwned + Sized {
    /// Save as a json object to a file.
    ///
    /// * `path` - Path to save to.
    fn save_config<P: AsRef<Path>>(&self, path: P) -> Result<(), DisparityError> {
        fs::write(path, self.json_dump()?).map_err(|e| DisparityError::UnableToWrite(e.to_string()))
    }

    /// Dump as a json object
    fn json_dump(&self) -> Result<String, DisparityError> {
        serde_json::to_string(self).map_err(|e| DisparityError::UnableToWrite(e.to_string()))
    }

    /// Load from Json string
    ///
    /// * `json_str` - String object, which can be serialized to json.
    fn from_json(json_str: &str) -> Result<Self, DisparityError> {
        serde_json::from_str::<Self>(json_str).map_err(|e| DisparityError::UnableToRead(e.to_string()))
    }

    /// Load from a path to a json object.
    ///
    /// * `path` - Path to load from.
    fn load_config<P: AsRef<Path>>(path: P) -> Result<Self, DisparityError> {
        let json_str = fs::read_to_string(path).map_err(|e| DisparityError::UnableToRead(e.to_string()))?;
        Self::from_json(&json_str)
    }
}

impl ConfigIO for IdieConfig {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::Learner;
    use tempfile::tempdir;

    #[test]
    fn test_config_default() {
        let cfg = IdieConfig::default();
        assert_eq!(cfg.max_iterations, 10);
        assert_eq!(cfg.cv_folds, 10);
        assert_eq!(cfg.metric, Metric::SquaredError);
        assert!(!cfg.recompute_se);
        assert_eq!(cfg.library_y.len(), 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_covariates_add_exposure_and_mediator() {
        let cfg = IdieConfig {
            confounders_z: vec!["age".to_string()],
            confounders_y: vec!["age".to_string(), "sex".to_string()],
            ..Default::default()
        };
        assert!(cfg.covariates(NuisanceRole::Exposure).is_empty());
        assert_eq!(cfg.covariates(NuisanceRole::Mediator), vec!["age", "A"]);
        assert_eq!(cfg.covariates(NuisanceRole::Outcome), vec!["age", "sex", "A", "Z"]);
        assert_eq!(cfg.target(NuisanceRole::Mediator), "Z");
    }

    #[test]
    fn test_config_validation() {
        let cfg = IdieConfig {
            confounders_y: vec!["Z".to_string()],
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DisparityError::DuplicateVariable(_, _))));

        let cfg = IdieConfig {
            library_z: Vec::new(),
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DisparityError::EmptyLibrary(_))));

        let cfg = IdieConfig {
            max_iterations: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(DisparityError::InvalidParameter(_, _, _))));

        let cfg = IdieConfig {
            probability_bound: 0.0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_io_json() {
        let json = r#"{"exposure": "race", "confounders_a": ["age"], "library_y": ["Glm", "GlmInteraction"]}"#;
        let cfg = IdieConfig::from_json(json).unwrap();
        assert_eq!(cfg.exposure, "race");
        assert_eq!(cfg.mediator, "Z");
        assert_eq!(cfg.library_y[1].name(), "GlmInteraction");
        assert_eq!(cfg.library_a.len(), 2);
        assert_eq!(cfg.max_iterations, 10);

        let dumped = cfg.json_dump().unwrap();
        let back = IdieConfig::from_json(&dumped).unwrap();
        assert_eq!(back.confounders_a, vec!["age"]);
    }

    #[test]
    fn test_config_io_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("idie.json");
        let cfg = IdieConfig {
            seed: 42,
            ..Default::default()
        };
        cfg.save_config(&file_path).unwrap();
        let back = IdieConfig::load_config(&file_path).unwrap();
        assert_eq!(back.seed, 42);
        assert!(IdieConfig::load_config(dir.path().join("missing.json")).is_err());
    }
}
