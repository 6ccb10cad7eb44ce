// Modules
pub mod causal;
pub mod constants;
pub mod data;
pub mod errors;
pub mod learner;
pub mod metric;
pub mod objective;
pub mod superlearner;
pub mod utils;

// Individual classes, and functions
pub use causal::config::{ConfigIO, IdieConfig};
pub use causal::idie::{estimate_idie_exposed, IdieEstimator};
pub use causal::result::IdieResult;
pub use data::{Dataset, Matrix};
pub use errors::DisparityError;
pub use learner::Algorithm;
