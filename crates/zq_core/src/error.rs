use thiserror::Error;

/// Errors surfaced by the Q-vector pipeline.
///
/// Degraded calibration availability is *not* an error: missing or empty
/// calibration slots only bound the recentering depth. Errors here mark
/// internal inconsistencies that must abort processing.
#[derive(Error, Debug)]
pub enum ZqError {
    /// A named object that passed load-time validation is missing at
    /// correction-lookup time.
    #[error("calibration object {name} missing from loaded slot (iteration {iteration}, step {step})")]
    MissingObject {
        name: String,
        iteration: usize,
        step: usize,
    },

    /// A correction lookup hit a table whose shape does not match the step
    /// it was loaded for.
    #[error("calibration table {name} has the wrong shape for (iteration {iteration}, step {step})")]
    TableShape {
        name: String,
        iteration: usize,
        step: usize,
    },

    /// A registry fill targeted an accumulator that was never registered.
    #[error("accumulator {0} not registered")]
    UnknownAccumulator(String),

    /// A registry fill targeted an accumulator of a different kind.
    #[error("accumulator {name} is not a {expected}")]
    AccumulatorKind {
        name: String,
        expected: &'static str,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ZqError>;
