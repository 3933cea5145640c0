//! Execution collaborator boundary.
//!
//! A [`ReadoutBackend`] takes an ordered circuit sequence plus a shot count
//! and returns one outcome histogram per circuit. This is where real or
//! simulated readout noise enters; the fitter treats the boundary as opaque.

use crate::calibration::CalibrationCircuit;
use crate::counts::OutcomeCounts;
use crate::error::{MitigationError, Result};

/// Metadata about an execution backend.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Unique identifier (e.g. `"noisy_sim"`).
    pub name: &'static str,
    /// One-line human-readable description.
    pub description: &'static str,
    /// Number of qubits the backend measures.
    pub num_qubits: usize,
}

/// Trait every execution backend implements.
pub trait ReadoutBackend {
    /// Backend metadata.
    fn info(&self) -> &BackendInfo;

    /// Execute each circuit for `shots` repetitions, returning one outcome
    /// histogram per circuit in the same order.
    fn execute(&self, circuits: &[CalibrationCircuit], shots: u64) -> Result<Vec<OutcomeCounts>>;

    /// Convenience: name from info.
    fn name(&self) -> &'static str {
        self.info().name
    }
}

/// Shared circuit validation for backend implementations.
pub(crate) fn check_circuits(
    circuits: &[CalibrationCircuit],
    num_qubits: usize,
) -> Result<()> {
    for (i, circuit) in circuits.iter().enumerate() {
        if circuit.num_qubits() != num_qubits {
            return Err(MitigationError::InconsistentMetadata(format!(
                "circuit {i} is {}-qubit, backend has {num_qubits} qubits",
                circuit.num_qubits()
            )));
        }
    }
    Ok(())
}
