use crate::causal::idie::IdieEstimator;
use crate::learner::Algorithm;
use crate::metric::Metric;

impl IdieEstimator {
    // Set methods for parameters

    /// Set the exposure variable.
    /// * `exposure` - Name of the binary exposure column.
    pub fn set_exposure(mut self, exposure: &str) -> Self {
        self.cfg.exposure = exposure.to_string();
        self
    }

    /// Set the mediator variable.
    /// * `mediator` - Name of the binary mediator column.
    pub fn set_mediator(mut self, mediator: &str) -> Self {
        self.cfg.mediator = mediator.to_string();
        self
    }

    /// Set the outcome variable.
    /// * `outcome` - Name of the binary outcome column.
    pub fn set_outcome(mut self, outcome: &str) -> Self {
        self.cfg.outcome = outcome.to_string();
        self
    }

    /// Set the confounders of the exposure model.
    pub fn set_confounders_a(mut self, confounders: Vec<String>) -> Self {
        self.cfg.confounders_a = confounders;
        self
    }

    /// Set the confounders of the mediator model.
    /// * `confounders` - Confounders; the exposure is added automatically.
    pub fn set_confounders_z(mut self, confounders: Vec<String>) -> Self {
        self.cfg.confounders_z = confounders;
        self
    }

    /// Set the confounders of the outcome model.
    /// * `confounders` - Confounders; exposure and mediator are added automatically.
    pub fn set_confounders_y(mut self, confounders: Vec<String>) -> Self {
        self.cfg.confounders_y = confounders;
        self
    }

    /// Set the candidate library of the exposure model.
    pub fn set_library_a(mut self, library: Vec<Algorithm>) -> Self {
        self.cfg.library_a = library;
        self
    }

    /// Set the candidate library of the mediator model.
    pub fn set_library_z(mut self, library: Vec<Algorithm>) -> Self {
        self.cfg.library_z = library;
        self
    }

    /// Set the candidate library of the outcome model.
    pub fn set_library_y(mut self, library: Vec<Algorithm>) -> Self {
        self.cfg.library_y = library;
        self
    }

    /// Set the iteration cap of the targeting loop.
    /// * `max_iterations` - At least 1. Reaching the cap is reported, not an error.
    pub fn set_max_iterations(mut self, max_iterations: usize) -> Self {
        self.cfg.max_iterations = max_iterations;
        self
    }

    /// Set the number of cross-validation folds.
    pub fn set_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cfg.cv_folds = cv_folds;
        self
    }

    /// Set whether folds are stratified on the target.
    pub fn set_stratify_cv(mut self, stratify_cv: bool) -> Self {
        self.cfg.stratify_cv = stratify_cv;
        self
    }

    /// Set the risk used to select candidates.
    pub fn set_metric(mut self, metric: Metric) -> Self {
        self.cfg.metric = metric;
        self
    }

    /// Set the seed of the fold assignment.
    pub fn set_seed(mut self, seed: u64) -> Self {
        self.cfg.seed = seed;
        self
    }

    /// Set the probability clipping bound.
    /// * `probability_bound` - Predictions are clipped into `[bound, 1 - bound]`.
    pub fn set_probability_bound(mut self, probability_bound: f64) -> Self {
        self.cfg.probability_bound = probability_bound;
        self
    }

    /// Set whether standard errors are recomputed from the targeted influence curve.
    pub fn set_recompute_se(mut self, recompute_se: bool) -> Self {
        self.cfg.recompute_se = recompute_se;
        self
    }

    /// Set the number of threads.
    /// * `num_threads` - Threads used to fit nuisance models, all cores when `None`.
    pub fn set_num_threads(mut self, num_threads: Option<usize>) -> Self {
        self.cfg.num_threads = num_threads;
        self
    }
}
