//! Learners
//!
//! Candidate algorithms for the discrete super learner. Every learner fits a
//! binary target and predicts `P(y = 1 | x)`. The [`Algorithm`] enum names the
//! built-in candidates and dispatches to them, and accepts user supplied
//! learners through [`Algorithm::Custom`].
pub mod glm;
pub mod mean;
pub mod stumps;

pub use glm::{fit_logistic, LogisticFit, LogisticRegression};
pub use mean::MeanLearner;
pub use stumps::BoostedStumps;

use crate::data::Matrix;
use crate::errors::DisparityError;
use crate::utils::items_to_strings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Trait implemented by every candidate algorithm.
pub trait Learner: Send + Sync {
    /// Fit on the rows of `x` against binary `y`.
    ///
    /// # Arguments
    /// * `x` – covariates, column major.
    /// * `y` – binary target (0 or 1).
    /// * `sample_weight` – optional per-sample weights.
    fn fit(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<Box<dyn FittedLearner>, DisparityError>;

    /// Name reported in cross-validated risk tables.
    fn name(&self) -> String {
        "Custom".to_string()
    }
}

/// A fitted learner, immutable once produced.
pub trait FittedLearner: Send + Sync {
    /// Predicted probabilities for each row of `x`.
    fn predict(&self, x: &Matrix<f64>) -> Vec<f64>;
}

/// Built-in candidate algorithms.
#[derive(Serialize, Deserialize, Clone)]
pub enum Algorithm {
    /// Intercept only; predicts the training prevalence.
    Mean,
    /// Main-terms logistic regression.
    Glm,
    /// Logistic regression on main terms and all pairwise products.
    GlmInteraction,
    /// Gradient boosted decision stumps on the log loss.
    BoostedStumps {
        /// Number of boosting rounds.
        rounds: Option<usize>,
        /// Shrinkage applied to each stump.
        learning_rate: Option<f64>,
    },
    /// Custom user-defined learner.
    #[serde(with = "learner_custom_serde")]
    Custom(Arc<dyn Learner>),
}

mod learner_custom_serde {
    use super::*;
    use serde::de::Error;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S>(learner: &Arc<dyn Learner>, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&learner.name())
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Arc<dyn Learner>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name: String = Deserialize::deserialize(d)?;
        Err(D::Error::custom(format!(
            "custom learner {} must be attached in code, it cannot be read from a config",
            name
        )))
    }
}

impl Algorithm {
    pub fn new_custom<T>(learner: T) -> Self
    where
        T: Learner + 'static,
    {
        Algorithm::Custom(Arc::new(learner))
    }
}

impl Learner for Algorithm {
    fn fit(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        sample_weight: Option<&[f64]>,
    ) -> Result<Box<dyn FittedLearner>, DisparityError> {
        match self {
            Algorithm::Mean => MeanLearner::default().fit(x, y, sample_weight),
            Algorithm::Glm => LogisticRegression::new(false).fit(x, y, sample_weight),
            Algorithm::GlmInteraction => LogisticRegression::new(true).fit(x, y, sample_weight),
            Algorithm::BoostedStumps { rounds, learning_rate } => {
                BoostedStumps::new(*rounds, *learning_rate).fit(x, y, sample_weight)
            }
            Algorithm::Custom(learner) => learner.fit(x, y, sample_weight),
        }
    }

    fn name(&self) -> String {
        match self {
            Algorithm::Mean => "Mean".to_string(),
            Algorithm::Glm => "Glm".to_string(),
            Algorithm::GlmInteraction => "GlmInteraction".to_string(),
            Algorithm::BoostedStumps { .. } => "BoostedStumps".to_string(),
            Algorithm::Custom(learner) => learner.name(),
        }
    }
}

impl fmt::Debug for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Algorithm {
    type Err = DisparityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Mean" => Ok(Algorithm::Mean),
            "Glm" => Ok(Algorithm::Glm),
            "GlmInteraction" => Ok(Algorithm::GlmInteraction),
            "BoostedStumps" => Ok(Algorithm::BoostedStumps {
                rounds: None,
                learning_rate: None,
            }),
            _ => Err(DisparityError::ParseString(
                s.to_string(),
                "Algorithm".to_string(),
                items_to_strings(vec!["Mean", "Glm", "GlmInteraction", "BoostedStumps"]),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);
    struct FittedConstant(f64);

    impl FittedLearner for FittedConstant {
        fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
            vec![self.0; x.rows]
        }
    }

    impl Learner for Constant {
        fn fit(
            &self,
            _x: &Matrix<f64>,
            _y: &[f64],
            _sample_weight: Option<&[f64]>,
        ) -> Result<Box<dyn FittedLearner>, DisparityError> {
            Ok(Box::new(FittedConstant(self.0)))
        }

        fn name(&self) -> String {
            "Constant".to_string()
        }
    }

    #[test]
    fn test_algorithm_parse() {
        assert_eq!("Glm".parse::<Algorithm>().unwrap().name(), "Glm");
        assert_eq!("BoostedStumps".parse::<Algorithm>().unwrap().name(), "BoostedStumps");
        assert!(matches!(
            "RandomForest".parse::<Algorithm>(),
            Err(DisparityError::ParseString(_, _, _))
        ));
    }

    #[test]
    fn test_custom_dispatch() {
        let alg = Algorithm::new_custom(Constant(0.25));
        assert_eq!(alg.name(), "Constant");
        let x = vec![1.0, 2.0, 3.0];
        let m = Matrix::new(&x, 3, 1);
        let fitted = alg.fit(&m, &[0.0, 1.0, 0.0], None).unwrap();
        assert_eq!(fitted.predict(&m), vec![0.25; 3]);
    }

    #[test]
    fn test_algorithm_serde() {
        let lib = vec![Algorithm::Mean, Algorithm::Glm];
        let json = serde_json::to_string(&lib).unwrap();
        let back: Vec<Algorithm> = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[1].name(), "Glm");

        let custom = serde_json::to_string(&Algorithm::new_custom(Constant(0.5))).unwrap();
        assert!(serde_json::from_str::<Algorithm>(&custom).is_err());
    }
}
