//! # qrem-core
//!
//! **Readout error mitigation for quantum measurement counts.**
//!
//! `qrem-core` fits measurement-error mitigators from computational-basis
//! calibration data and answers assignment-matrix and fidelity queries for
//! arbitrary qubit subsets.
//!
//! ## Quick Start
//!
//! ```
//! use qrem_core::backend::ReadoutBackend;
//! use qrem_core::calibration::{generate_calibration, standard_labels};
//! use qrem_core::fitter::{FitMethod, fit};
//! use qrem_core::sim::{NoisySimulator, ReadoutNoise};
//!
//! # fn main() -> Result<(), qrem_core::MitigationError> {
//! let labels = standard_labels(4);
//! let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
//! let (circuits, metadata) = generate_calibration(4, &refs)?;
//!
//! let backend = NoisySimulator::new(ReadoutNoise::uniform(4, 0.02, 0.04), 42);
//! let counts = backend.execute(&circuits, 8192)?;
//!
//! let mitigator = fit(&counts, &metadata, FitMethod::Ctmp)?;
//! let fidelity = mitigator.assignment_fidelity(&[0])?;
//! assert!(fidelity > 0.9);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Generator → (backend execution) → counts → fitter → mitigator → queries
//!
//! Two fitting strategies:
//! - **LeastSquares**: direct empirical assignment-matrix estimation,
//!   marginalized on demand onto any queried subset.
//! - **Ctmp**: local one- and two-qubit error generator rates, exponentiated
//!   per subset. Storage is O(N²) rates; no 2^N matrix is ever built.
//!
//! Mitigators are immutable once fitted; every query is a pure read.
//! Job submission and persistence live at the boundaries: any
//! [`backend::ReadoutBackend`] produces counts, and [`session`] replays
//! saved runs as JSON.

pub mod backend;
pub mod calibration;
pub mod counts;
pub mod ctmp;
pub mod error;
pub mod fitter;
pub mod matrix;
pub mod mitigator;
pub mod session;
pub mod sim;

pub use backend::{BackendInfo, ReadoutBackend};
pub use calibration::{
    CalibrationCircuit, CalibrationLabel, CalibrationMetadata, generate_calibration,
    standard_labels,
};
pub use counts::OutcomeCounts;
pub use ctmp::{CtmpModel, Generator};
pub use error::{MitigationError, Result};
pub use fitter::{FitMethod, empirical_assignment_matrix, fit};
pub use matrix::Matrix;
pub use mitigator::{MitigatedDistribution, Mitigator, raw_expectation};
pub use session::{CalibrationRun, RUN_FORMAT_VERSION};
pub use sim::{NoisySimulator, ReadoutNoise};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
