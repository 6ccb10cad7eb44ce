//! Errors
//!
//! Custom error types used throughout the `disparity` crate.
use thiserror::Error;

/// Errors that can occur while validating data, fitting nuisance models
/// or running the targeted estimator.
#[derive(Debug, Error)]
pub enum DisparityError {
    /// A required variable is not present in the dataset.
    #[error("Variable {0} was not found in the dataset.")]
    MissingVariable(String),
    /// Exposure, mediator or outcome does not take exactly two values.
    #[error("Variable {0} must take exactly two distinct values, found {1}.")]
    NotBinary(String, usize),
    /// A referenced column holds NaN or infinite values.
    #[error("Variable {0} contains non-finite values.")]
    NonFinite(String),
    /// A confounder list repeats one of the exposure, mediator or outcome names.
    #[error("Variable {0} is the {1} and must not be listed as a confounder.")]
    DuplicateVariable(String, String),
    /// A column of the wrong length was added to a dataset.
    #[error("Column {0} has {2} rows, expected {1}.")]
    LengthMismatch(String, usize, usize),
    /// A candidate library with no algorithms was supplied.
    #[error("The learner library for the {0} model is empty.")]
    EmptyLibrary(String),
    /// Every candidate in a library failed to fit.
    #[error("Every candidate algorithm failed for the {0} model: {1}")]
    AllCandidatesFailed(String, String),
    /// A single candidate algorithm failed to fit.
    #[error("Algorithm {0} failed to fit: {1}")]
    FitFailed(String, String),
    /// Invalid value parsing.
    #[error("Invalid value {0} passed for {1}, expected one of {2}.")]
    ParseString(String, String, String),
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Unable to write a config or result to file.
    #[error("Unable to write to file: {0}")]
    UnableToWrite(String),
    /// Unable to read a config from file.
    #[error("Unable to read from file {0}")]
    UnableToRead(String),
}
