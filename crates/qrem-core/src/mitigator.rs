//! Fitted mitigator: the immutable query engine.
//!
//! A [`Mitigator`] exists only in the "fit" state — it is created fully
//! populated by [`crate::fitter::fit`] and never mutated afterwards. Every
//! query is a pure read: assignment matrices and fidelities for arbitrary
//! qubit subsets, inverse-based count correction, and mitigated expectation
//! values.

use serde::Serialize;

use crate::calibration::CalibrationMetadata;
use crate::counts::OutcomeCounts;
use crate::ctmp::CtmpModel;
use crate::error::{MitigationError, Result};
use crate::fitter::{FitMethod, empirical_assignment_matrix};
use crate::matrix::Matrix;

/// Fitted readout error mitigator.
#[derive(Debug, Clone)]
pub struct Mitigator {
    num_qubits: usize,
    method: FitMethod,
    model: Model,
}

#[derive(Debug, Clone)]
enum Model {
    /// Raw calibration data; subset matrices are built on demand by
    /// marginalization.
    Local {
        counts: Vec<OutcomeCounts>,
        metadata: CalibrationMetadata,
    },
    /// Generator-rate model; subset matrices are built by exponentiation.
    Ctmp(CtmpModel),
}

impl Mitigator {
    pub(crate) fn local(counts: Vec<OutcomeCounts>, metadata: CalibrationMetadata) -> Self {
        Self {
            num_qubits: metadata.num_qubits(),
            method: FitMethod::LeastSquares,
            model: Model::Local { counts, metadata },
        }
    }

    pub(crate) fn ctmp(model: CtmpModel, num_qubits: usize) -> Self {
        Self {
            num_qubits,
            method: FitMethod::Ctmp,
            model: Model::Ctmp(model),
        }
    }

    /// Qubit count the mitigator was fitted over.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Estimation method used at fit time.
    pub fn method(&self) -> FitMethod {
        self.method
    }

    /// Clipped-rate residual of a CTMP fit; `None` for the direct method.
    pub fn fit_residual(&self) -> Option<f64> {
        match &self.model {
            Model::Local { .. } => None,
            Model::Ctmp(model) => Some(model.fit_residual()),
        }
    }

    /// Fitted generator model, when the CTMP method was used.
    pub fn ctmp_model(&self) -> Option<&CtmpModel> {
        match &self.model {
            Model::Local { .. } => None,
            Model::Ctmp(model) => Some(model),
        }
    }

    fn validate_subset(&self, qubits: &[usize]) -> Result<()> {
        if qubits.is_empty() {
            return Err(MitigationError::InvalidQubitSubset(
                "empty subset".to_string(),
            ));
        }
        let mut seen = vec![false; self.num_qubits];
        for &q in qubits {
            if q >= self.num_qubits {
                return Err(MitigationError::InvalidQubitSubset(format!(
                    "qubit {q} out of range for {} qubits",
                    self.num_qubits
                )));
            }
            if seen[q] {
                return Err(MitigationError::InvalidQubitSubset(format!(
                    "qubit {q} duplicated"
                )));
            }
            seen[q] = true;
        }
        Ok(())
    }

    /// Assignment matrix `P(measured | prepared)` restricted to an ordered
    /// qubit subset. Column-stochastic; bit `i` of a basis-state index
    /// refers to `qubits[i]`.
    pub fn assignment_matrix(&self, qubits: &[usize]) -> Result<Matrix> {
        self.validate_subset(qubits)?;
        Ok(match &self.model {
            Model::Local { counts, metadata } => {
                empirical_assignment_matrix(counts, metadata, qubits)
            }
            Model::Ctmp(model) => model.assignment_matrix(qubits),
        })
    }

    /// Mean diagonal of the subset assignment matrix. 1.0 exactly for
    /// perfect readout; decreases monotonically with readout error.
    pub fn assignment_fidelity(&self, qubits: &[usize]) -> Result<f64> {
        Ok(self.assignment_matrix(qubits)?.mean_diagonal())
    }

    /// Inverse of the subset assignment matrix, used to undo readout error
    /// on measured distributions.
    pub fn mitigation_matrix(&self, qubits: &[usize]) -> Result<Matrix> {
        Ok(self.assignment_matrix(qubits)?.inverse())
    }

    /// Apply the inverse assignment matrix to measured counts, marginalized
    /// onto the subset.
    ///
    /// Counts must share the mitigator's qubit width. The raw output is a
    /// quasi-probability vector (entries may be slightly negative); a
    /// clipped, renormalised distribution is reported alongside it.
    pub fn mitigate_counts(
        &self,
        counts: &OutcomeCounts,
        qubits: &[usize],
    ) -> Result<MitigatedDistribution> {
        self.validate_subset(qubits)?;
        if counts.num_qubits() != self.num_qubits {
            return Err(MitigationError::InconsistentMetadata(format!(
                "counts are {}-qubit, mitigator is {}-qubit",
                counts.num_qubits(),
                self.num_qubits
            )));
        }
        if !counts.outcomes_well_formed() {
            return Err(MitigationError::InconsistentMetadata(format!(
                "counts contain outcomes that are not {}-character bit-strings",
                self.num_qubits
            )));
        }
        if counts.total_shots() == 0 {
            return Err(MitigationError::EmptyCounts { circuit: 0 });
        }

        let measured = counts.marginalize(qubits).probability_vector();
        let raw = self.mitigation_matrix(qubits)?.mul_vec(&measured);

        let mut probabilities: Vec<f64> = raw.iter().map(|p| p.max(0.0)).collect();
        let total: f64 = probabilities.iter().sum();
        if total > 1e-15 {
            for p in &mut probabilities {
                *p /= total;
            }
        }
        let negative_mass = raw.iter().filter(|p| **p < 0.0).map(|p| p.abs()).sum();

        Ok(MitigatedDistribution {
            qubits: qubits.to_vec(),
            raw,
            probabilities,
            negative_mass,
        })
    }

    /// Error-mitigated expectation value of `Z ⊗ … ⊗ Z` on the subset.
    ///
    /// Computed from the raw quasi-probabilities, which keeps the estimator
    /// unbiased even when clipping would shift mass.
    pub fn expectation_value(&self, counts: &OutcomeCounts, qubits: &[usize]) -> Result<f64> {
        let mitigated = self.mitigate_counts(counts, qubits)?;
        Ok(mitigated
            .raw
            .iter()
            .enumerate()
            .map(|(state, p)| p * parity(state))
            .sum())
    }
}

/// Mitigated distribution over a qubit subset.
#[derive(Debug, Clone, Serialize)]
pub struct MitigatedDistribution {
    /// The queried subset, in query order.
    pub qubits: Vec<usize>,
    /// Quasi-probabilities straight from the inverse (may contain small
    /// negatives).
    pub raw: Vec<f64>,
    /// Clipped and renormalised probabilities.
    pub probabilities: Vec<f64>,
    /// Total absolute mass of negative quasi-probabilities — a correction
    /// quality indicator.
    pub negative_mass: f64,
}

impl MitigatedDistribution {
    /// Clipped probability of a basis state.
    pub fn probability(&self, state: usize) -> f64 {
        self.probabilities.get(state).copied().unwrap_or(0.0)
    }

    /// Most likely basis state after correction.
    pub fn most_likely_state(&self) -> (usize, f64) {
        self.probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, p)| (i, *p))
            .unwrap_or((0, 0.0))
    }
}

/// Unmitigated `Z ⊗ … ⊗ Z` expectation from raw counts, for comparison with
/// [`Mitigator::expectation_value`].
pub fn raw_expectation(counts: &OutcomeCounts, qubits: &[usize]) -> f64 {
    let probs = counts.marginalize(qubits).probability_vector();
    probs
        .iter()
        .enumerate()
        .map(|(state, p)| p * parity(state))
        .sum()
}

fn parity(state: usize) -> f64 {
    if state.count_ones() % 2 == 0 { 1.0 } else { -1.0 }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::standard_labels;
    use crate::counts::{bitstring_index, index_bitstring, restrict_bitstring};
    use crate::fitter::{FitMethod, fit};

    fn ideal_mitigator(n: usize) -> Mitigator {
        let labels = standard_labels(n);
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let metadata = CalibrationMetadata::new(n, &refs).unwrap();
        let counts: Vec<OutcomeCounts> = metadata
            .labels()
            .iter()
            .map(|label| {
                let mut c = OutcomeCounts::new(n);
                c.record(label.as_str(), 8192);
                c
            })
            .collect();
        fit(&counts, &metadata, FitMethod::LeastSquares).unwrap()
    }

    /// Calibration counts with a symmetric 2% flip on every qubit,
    /// constructed deterministically from binomial expectations.
    fn noisy_mitigator(n: usize, flip: f64, method: FitMethod) -> Mitigator {
        let labels = standard_labels(n);
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let metadata = CalibrationMetadata::new(n, &refs).unwrap();
        let shots = 1_000_000u64;
        let counts: Vec<OutcomeCounts> = metadata
            .labels()
            .iter()
            .map(|label| {
                let prepared = bitstring_index(label.as_str());
                let mut c = OutcomeCounts::new(n);
                for measured in 0..(1usize << n) {
                    let flips = (prepared ^ measured).count_ones() as i32;
                    let p = flip.powi(flips) * (1.0 - flip).powi(n as i32 - flips);
                    let count = (p * shots as f64).round() as u64;
                    if count > 0 {
                        c.record(&index_bitstring(measured, n), count);
                    }
                }
                c
            })
            .collect();
        fit(&counts, &metadata, method).unwrap()
    }

    #[test]
    fn subset_validation() {
        let mitigator = ideal_mitigator(4);
        assert!(matches!(
            mitigator.assignment_matrix(&[0, 5]).unwrap_err(),
            MitigationError::InvalidQubitSubset(_)
        ));
        assert!(matches!(
            mitigator.assignment_matrix(&[1, 1]).unwrap_err(),
            MitigationError::InvalidQubitSubset(_)
        ));
        assert!(matches!(
            mitigator.assignment_fidelity(&[]).unwrap_err(),
            MitigationError::InvalidQubitSubset(_)
        ));
    }

    #[test]
    fn ideal_fidelity_is_one() {
        let mitigator = ideal_mitigator(4);
        for q in 0..4 {
            assert!((mitigator.assignment_fidelity(&[q]).unwrap() - 1.0).abs() < 1e-12);
        }
        let a = mitigator.assignment_matrix(&[0, 1, 2, 3]).unwrap();
        assert!((a.mean_diagonal() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn noisy_fidelity_within_bounds() {
        for method in [FitMethod::LeastSquares, FitMethod::Ctmp] {
            let mitigator = noisy_mitigator(4, 0.02, method);
            for q in 0..4 {
                let f = mitigator.assignment_fidelity(&[q]).unwrap();
                assert!((0.95..=1.0).contains(&f), "{method} qubit {q}: {f}");
            }
        }
    }

    #[test]
    fn assignment_matrix_is_stochastic_for_both_methods() {
        for method in [FitMethod::LeastSquares, FitMethod::Ctmp] {
            let mitigator = noisy_mitigator(3, 0.03, method);
            for subset in [vec![0], vec![1, 2], vec![0, 1, 2], vec![2, 0]] {
                let a = mitigator.assignment_matrix(&subset).unwrap();
                assert!(a.is_stochastic(1e-8), "{method} subset {subset:?}");
            }
        }
    }

    #[test]
    fn marginalization_consistency() {
        // Direct subset query equals the all-qubit matrix marginalized onto
        // the subset.
        let mitigator = noisy_mitigator(3, 0.02, FitMethod::LeastSquares);
        let full = mitigator.assignment_matrix(&[0, 1, 2]).unwrap();
        let subset = [0usize, 2];
        let direct = mitigator.assignment_matrix(&subset).unwrap();

        // Weight full columns by how often the calibration set prepares
        // them — uncovered prepared states carry no data and no weight.
        let labels = standard_labels(3);
        let dim_sub = 1usize << subset.len();
        let mut marginal = Matrix::zeros(dim_sub);
        let mut col_weight = vec![0.0f64; dim_sub];
        for label in &labels {
            let prepared = bitstring_index(label);
            let p_sub = bitstring_index(&restrict_bitstring(label, &subset));
            for measured in 0..full.dim() {
                let m_sub =
                    bitstring_index(&restrict_bitstring(&index_bitstring(measured, 3), &subset));
                marginal.add(m_sub, p_sub, full.get(measured, prepared));
            }
            col_weight[p_sub] += 1.0;
        }
        for col in 0..dim_sub {
            for row in 0..dim_sub {
                let value = marginal.get(row, col) / col_weight[col];
                assert!(
                    (value - direct.get(row, col)).abs() < 5e-3,
                    "entry ({row},{col})"
                );
            }
        }
    }

    #[test]
    fn mitigation_restores_distribution() {
        let mitigator = noisy_mitigator(2, 0.05, FitMethod::LeastSquares);
        // A noisy observation of |00⟩ with the same 5% flip model.
        let mut counts = OutcomeCounts::new(2);
        counts.record("00", 9025);
        counts.record("01", 475);
        counts.record("10", 475);
        counts.record("11", 25);
        let mitigated = mitigator.mitigate_counts(&counts, &[0, 1]).unwrap();
        assert!(mitigated.probability(0) > 0.999);
        let sum: f64 = mitigated.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-10);
        assert_eq!(mitigated.most_likely_state().0, 0);
    }

    #[test]
    fn mitigated_expectation_beats_raw() {
        let mitigator = noisy_mitigator(2, 0.05, FitMethod::LeastSquares);
        // True state |00⟩ has ⟨ZZ⟩ = 1; readout noise biases it down.
        let mut counts = OutcomeCounts::new(2);
        counts.record("00", 9025);
        counts.record("01", 475);
        counts.record("10", 475);
        counts.record("11", 25);
        let raw = raw_expectation(&counts, &[0, 1]);
        let mitigated = mitigator.expectation_value(&counts, &[0, 1]).unwrap();
        assert!(raw < 0.85);
        assert!((mitigated - 1.0).abs() < 1e-3);
    }

    #[test]
    fn mitigate_rejects_mismatched_counts() {
        let mitigator = ideal_mitigator(3);
        let counts = OutcomeCounts::new(2);
        assert!(matches!(
            mitigator.mitigate_counts(&counts, &[0]).unwrap_err(),
            MitigationError::InconsistentMetadata(_)
        ));
    }

    #[test]
    fn mitigate_rejects_malformed_outcomes() {
        // Deserialized counts can carry outcome keys of the wrong width;
        // these must surface as an error, never reach marginalization.
        let mitigator = ideal_mitigator(2);
        let mut counts = OutcomeCounts::new(2);
        counts.record("0", 100);
        assert!(matches!(
            mitigator.mitigate_counts(&counts, &[0, 1]).unwrap_err(),
            MitigationError::InconsistentMetadata(_)
        ));

        let mut counts = OutcomeCounts::new(2);
        counts.record("0x", 100);
        assert!(matches!(
            mitigator.expectation_value(&counts, &[0]).unwrap_err(),
            MitigationError::InconsistentMetadata(_)
        ));
    }

    #[test]
    fn ctmp_residual_exposed() {
        let mitigator = noisy_mitigator(2, 0.02, FitMethod::Ctmp);
        assert!(mitigator.fit_residual().is_some());
        assert!(mitigator.ctmp_model().is_some());
        let lsq = ideal_mitigator(2);
        assert!(lsq.fit_residual().is_none());
    }
}
