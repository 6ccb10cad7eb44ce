pub const PROBABILITY_BOUND: f64 = 1e-6;
pub const MAX_ITERATIONS: usize = 10;
pub const CV_FOLDS: usize = 10;
pub const IRLS_MAX_ITER: usize = 25;
pub const IRLS_TOLERANCE: f64 = 1e-8;
pub const RIDGE_JITTER: f64 = 1e-8;
pub const FLUCTUATION_MAX_ITER: usize = 50;
pub const STUMP_ROUNDS: usize = 100;
pub const STUMP_LEARNING_RATE: f64 = 0.1;
pub const HESSIAN_EPS: f64 = 1e-12;
pub const Z_975: f64 = 1.959963984540054;
