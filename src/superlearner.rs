//! Discrete Super Learner
//!
//! Cross-validated selection of the single best candidate algorithm from a
//! library. Candidates are scored on their held-out predictions, the one
//! with the lowest risk is refit on all rows and wrapped in a
//! [`NuisanceModel`]. The estimator only depends on the [`ModelSelector`]
//! trait, so other selection procedures can be plugged in.
use crate::constants::{CV_FOLDS, PROBABILITY_BOUND};
use crate::data::{Dataset, Matrix};
use crate::errors::DisparityError;
use crate::learner::{Algorithm, FittedLearner, Learner};
use crate::metric::{is_comparison_better, Metric};
use crate::utils::bound_probability;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The three regressions the estimator needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NuisanceRole {
    /// Exposure given confounders.
    Exposure,
    /// Mediator given confounders and exposure.
    Mediator,
    /// Outcome given confounders, exposure and mediator.
    Outcome,
}

impl fmt::Display for NuisanceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NuisanceRole::Exposure => "exposure",
            NuisanceRole::Mediator => "mediator",
            NuisanceRole::Outcome => "outcome",
        };
        write!(f, "{}", s)
    }
}

/// Cross-validated risk of one candidate. `NaN` marks a candidate that failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvRisk {
    pub algorithm: String,
    pub risk: f64,
}

/// A fitted nuisance regression: the selected candidate refit on all rows.
pub struct NuisanceModel {
    pub role: NuisanceRole,
    /// Covariates, in design order, the model was fit on.
    pub covariates: Vec<String>,
    pub selected_algorithm_name: String,
    pub cv_risks: Vec<CvRisk>,
    fitted: Box<dyn FittedLearner>,
}

impl NuisanceModel {
    pub fn new(
        role: NuisanceRole,
        covariates: Vec<String>,
        selected_algorithm_name: String,
        cv_risks: Vec<CvRisk>,
        fitted: Box<dyn FittedLearner>,
    ) -> Self {
        NuisanceModel {
            role,
            covariates,
            selected_algorithm_name,
            cv_risks,
            fitted,
        }
    }

    /// Predicted probabilities for a design built over `self.covariates`.
    pub fn predict(&self, x: &Matrix<f64>) -> Vec<f64> {
        self.fitted.predict(x)
    }

    /// Predict on every row of `data`, with the columns in `forced` set to
    /// the given constants. `data` itself is never modified.
    pub fn predict_dataset(&self, data: &Dataset, forced: &[(&str, f64)]) -> Result<Vec<f64>, DisparityError> {
        let design = data.design(&self.covariates, forced)?;
        Ok(self.predict(&Matrix::new(&design, data.rows(), self.covariates.len())))
    }
}

impl fmt::Debug for NuisanceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NuisanceModel")
            .field("role", &self.role)
            .field("covariates", &self.covariates)
            .field("selected_algorithm_name", &self.selected_algorithm_name)
            .field("cv_risks", &self.cv_risks)
            .finish()
    }
}

/// Capability used by the estimator to obtain nuisance models.
pub trait ModelSelector: Send + Sync {
    /// Fit `target` on `covariates` of `data`, choosing among `library`.
    fn fit(
        &self,
        role: NuisanceRole,
        data: &Dataset,
        target: &str,
        covariates: &[String],
        library: &[Algorithm],
    ) -> Result<NuisanceModel, DisparityError>;
}

/// V-fold discrete super learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscreteSuperLearner {
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Balance outcome levels across folds.
    pub stratify: bool,
    /// Seed for the fold assignment.
    pub seed: u64,
    /// Risk used to compare candidates.
    pub metric: Metric,
    /// Held-out predictions are clipped into `[bound, 1 - bound]` before scoring.
    pub probability_bound: f64,
}

impl Default for DiscreteSuperLearner {
    fn default() -> Self {
        DiscreteSuperLearner {
            folds: CV_FOLDS,
            stratify: false,
            seed: 0,
            metric: Metric::default(),
            probability_bound: PROBABILITY_BOUND,
        }
    }
}

impl DiscreteSuperLearner {
    /// Fold id of every row. Fold sizes differ by at most one.
    pub fn fold_ids(&self, y: &[f64]) -> Vec<usize> {
        let n = y.len();
        let v = self.folds.min(n).max(1);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut fold = vec![0; n];
        let groups: Vec<Vec<usize>> = if self.stratify {
            vec![
                (0..n).filter(|&i| y[i] == 0.0).collect(),
                (0..n).filter(|&i| y[i] != 0.0).collect(),
            ]
        } else {
            vec![(0..n).collect()]
        };
        let mut k = 0;
        for mut group in groups {
            group.shuffle(&mut rng);
            for i in group {
                fold[i] = k % v;
                k += 1;
            }
        }
        fold
    }

    /// Held-out predictions of every candidate, in library order.
    fn cross_validate(
        &self,
        x: &Matrix<f64>,
        y: &[f64],
        library: &[Algorithm],
    ) -> Vec<Result<Vec<f64>, DisparityError>> {
        let fold = self.fold_ids(y);
        let v = fold.iter().copied().max().map_or(0, |m| m + 1);
        let splits: Vec<(Vec<usize>, Vec<usize>)> = (0..v)
            .map(|k| {
                let train = (0..y.len()).filter(|&i| fold[i] != k).collect();
                let test = (0..y.len()).filter(|&i| fold[i] == k).collect();
                (train, test)
            })
            .collect();

        let tasks: Vec<(usize, usize)> = (0..library.len())
            .flat_map(|a| (0..v).map(move |k| (a, k)))
            .collect();
        let fold_predictions: Vec<Result<Vec<f64>, DisparityError>> = tasks
            .par_iter()
            .map(|&(a, k)| {
                let (train, test) = &splits[k];
                let x_train = x.take_rows(train);
                let y_train: Vec<f64> = train.iter().map(|&i| y[i]).collect();
                let x_test = x.take_rows(test);
                let fitted = library[a].fit(&Matrix::new(&x_train, train.len(), x.cols), &y_train, None)?;
                Ok(fitted.predict(&Matrix::new(&x_test, test.len(), x.cols)))
            })
            .collect();

        let mut results = Vec::with_capacity(library.len());
        let mut chunks = fold_predictions.into_iter();
        for _ in 0..library.len() {
            let mut held_out = vec![f64::NAN; y.len()];
            let mut failure = None;
            for (_, test) in splits.iter() {
                match chunks.next() {
                    Some(Ok(p)) => test.iter().zip(p).for_each(|(&i, p_)| held_out[i] = p_),
                    Some(Err(e)) => failure = Some(e),
                    None => {}
                }
            }
            results.push(match failure {
                Some(e) => Err(e),
                None => Ok(held_out),
            });
        }
        results
    }
}

impl ModelSelector for DiscreteSuperLearner {
    fn fit(
        &self,
        role: NuisanceRole,
        data: &Dataset,
        target: &str,
        covariates: &[String],
        library: &[Algorithm],
    ) -> Result<NuisanceModel, DisparityError> {
        if library.is_empty() {
            return Err(DisparityError::EmptyLibrary(role.to_string()));
        }
        let y = data.column(target)?;
        let design = data.design(covariates, &[])?;
        let x = Matrix::new(&design, data.rows(), covariates.len());

        let mut failures = Vec::new();
        let cv_risks: Vec<CvRisk> = self
            .cross_validate(&x, y, library)
            .into_iter()
            .zip(library)
            .map(|(held_out, alg)| {
                let risk = match held_out {
                    Ok(p) => {
                        let p: Vec<f64> = p
                            .into_iter()
                            .map(|v| bound_probability(v, self.probability_bound))
                            .collect();
                        self.metric.risk(y, &p, self.probability_bound)
                    }
                    Err(e) => {
                        warn!("Candidate {} failed for the {} model: {}", alg.name(), role, e);
                        failures.push(e.to_string());
                        f64::NAN
                    }
                };
                debug!("{} model, {}: cv risk {:.6}", role, alg.name(), risk);
                CvRisk {
                    algorithm: alg.name(),
                    risk,
                }
            })
            .collect();

        // Refit candidates on all rows from the lowest risk upward until one succeeds.
        let mut ranked: Vec<usize> = (0..library.len()).filter(|&a| cv_risks[a].risk.is_finite()).collect();
        ranked.sort_by(|&a, &b| {
            if is_comparison_better(cv_risks[a].risk, cv_risks[b].risk, self.metric.maximize()) {
                std::cmp::Ordering::Greater
            } else if is_comparison_better(cv_risks[b].risk, cv_risks[a].risk, self.metric.maximize()) {
                std::cmp::Ordering::Less
            } else {
                std::cmp::Ordering::Equal
            }
        });
        for a in ranked {
            match library[a].fit(&x, y, None) {
                Ok(fitted) => {
                    info!(
                        "Selected {} for the {} model with cv risk {:.6}.",
                        library[a].name(),
                        role,
                        cv_risks[a].risk
                    );
                    return Ok(NuisanceModel::new(
                        role,
                        covariates.to_vec(),
                        library[a].name(),
                        cv_risks,
                        fitted,
                    ));
                }
                Err(e) => {
                    warn!("Candidate {} failed on the full data for the {} model: {}", library[a].name(), role, e);
                    failures.push(e.to_string());
                }
            }
        }
        Err(DisparityError::AllCandidatesFailed(role.to_string(), failures.join("; ")))
    }
}
