//! Error taxonomy for calibration generation, fitting, and mitigator queries.
//!
//! Every variant signals malformed input or numerical non-convergence. None
//! are retryable and none are recovered internally — fitting either yields a
//! fully populated [`crate::mitigator::Mitigator`] or fails with no partial
//! object.

use thiserror::Error;

/// Errors raised by the calibration generator, the fitter, and mitigator
/// queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MitigationError {
    /// A calibration label has the wrong length, contains characters outside
    /// `{0,1}`, or duplicates another label in the same set.
    #[error("invalid calibration label: {0}")]
    InvalidLabel(String),

    /// A calibration circuit has zero observed shots.
    #[error("calibration circuit {circuit} has no counts")]
    EmptyCounts {
        /// Index of the offending circuit.
        circuit: usize,
    },

    /// Counts and metadata disagree in length or qubit width.
    #[error("inconsistent calibration data: {0}")]
    InconsistentMetadata(String),

    /// The rate estimation did not converge within its iteration and
    /// tolerance bounds. Carries the achieved residual.
    #[error("fit did not converge after {iterations} iterations (residual {residual:.3e})")]
    FitConvergence {
        /// Residual left after the final iteration.
        residual: f64,
        /// Number of iterations performed before giving up.
        iterations: usize,
    },

    /// A queried qubit subset contains out-of-range or duplicated indices,
    /// or is empty.
    #[error("invalid qubit subset: {0}")]
    InvalidQubitSubset(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, MitigationError>;
