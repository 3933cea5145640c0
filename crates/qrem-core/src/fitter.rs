//! Mitigator fitting: validation, method dispatch, and rate estimation.
//!
//! `fit` is the single entry point. It validates raw calibration data
//! up front, then hands off to the selected estimation strategy. Fitting
//! either succeeds with an immutable [`Mitigator`] or fails outright —
//! there is no partial result.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::calibration::CalibrationMetadata;
use crate::counts::{OutcomeCounts, bitstring_index, restrict_bitstring};
use crate::ctmp::{CtmpModel, Generator};
use crate::error::{MitigationError, Result};
use crate::matrix::Matrix;
use crate::mitigator::Mitigator;

/// Estimation strategy for [`fit`].
///
/// A tagged variant rather than a method string: each tag has exactly one
/// implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitMethod {
    /// Direct empirical assignment-matrix estimation: marginalize counts
    /// onto the queried subset and normalize measured-given-prepared
    /// histograms per column.
    LeastSquares,
    /// Continuous-time Markov process rate estimation: fit local one- and
    /// two-qubit generator rates and exponentiate on demand.
    Ctmp,
}

impl FitMethod {
    /// Stable lowercase name used in reports and the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            FitMethod::LeastSquares => "lsq",
            FitMethod::Ctmp => "ctmp",
        }
    }
}

impl std::fmt::Display for FitMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fit a readout mitigator from calibration counts.
///
/// Validation order: counts/metadata alignment, per-circuit shot totals,
/// outcome bit-string width. Only then does estimation run.
pub fn fit(
    counts: &[OutcomeCounts],
    metadata: &CalibrationMetadata,
    method: FitMethod,
) -> Result<Mitigator> {
    if counts.len() != metadata.len() {
        return Err(MitigationError::InconsistentMetadata(format!(
            "{} count sets for {} calibration circuits",
            counts.len(),
            metadata.len()
        )));
    }
    for (circuit, outcome_counts) in counts.iter().enumerate() {
        if outcome_counts.total_shots() == 0 {
            return Err(MitigationError::EmptyCounts { circuit });
        }
        if outcome_counts.num_qubits() != metadata.num_qubits()
            || !outcome_counts.outcomes_well_formed()
        {
            return Err(MitigationError::InconsistentMetadata(format!(
                "circuit {circuit} outcomes do not match the {}-qubit metadata",
                metadata.num_qubits()
            )));
        }
    }

    debug!(
        "fitting {} calibration circuits over {} qubits with method {}",
        counts.len(),
        metadata.num_qubits(),
        method
    );

    match method {
        FitMethod::LeastSquares => Ok(Mitigator::local(counts.to_vec(), metadata.clone())),
        FitMethod::Ctmp => {
            let model = fit_ctmp(counts, metadata)?;
            debug!(
                "ctmp fit: {} generators, total rate {:.4}, clipped residual {:.3e}",
                model.rates().len(),
                model.total_rate(),
                model.fit_residual()
            );
            Ok(Mitigator::ctmp(model, metadata.num_qubits()))
        }
    }
}

/// Empirical assignment matrix for an ordered qubit subset.
///
/// Every circuit's counts are marginalized onto the subset and accumulated
/// into the column of the subset state its label prepares; columns are then
/// normalized. A prepared state no circuit covers defaults to the identity
/// column, so the result is always stochastic.
pub fn empirical_assignment_matrix(
    counts: &[OutcomeCounts],
    metadata: &CalibrationMetadata,
    qubits: &[usize],
) -> Matrix {
    let dim = 1usize << qubits.len();
    let mut accum = Matrix::zeros(dim);
    let mut column_totals = vec![0.0f64; dim];

    for (circuit, outcome_counts) in counts.iter().enumerate() {
        let prepared = bitstring_index(&restrict_bitstring(
            metadata.label(circuit).as_str(),
            qubits,
        ));
        let marginal = outcome_counts.marginalize(qubits);
        for (outcome, count) in marginal.iter() {
            accum.add(bitstring_index(outcome), prepared, count as f64);
            column_totals[prepared] += count as f64;
        }
    }

    let mut matrix = Matrix::zeros(dim);
    for col in 0..dim {
        if column_totals[col] > 0.0 {
            for row in 0..dim {
                matrix.set(row, col, accum.get(row, col) / column_totals[col]);
            }
        } else {
            matrix.set(col, col, 1.0);
        }
    }
    matrix
}

// ---------------------------------------------------------------------------
// CTMP rate estimation
// ---------------------------------------------------------------------------

/// Fit local generator rates from pairwise assignment-matrix logarithms.
///
/// For every qubit pair the empirical 4x4 assignment matrix is logged; the
/// anti-diagonal block entries give the pair flip rates directly, and the
/// single-flip entries are averaged over every pair containing the qubit.
/// Negative estimates are clipped to zero (the non-negativity constraint);
/// the clipped mass is kept as the fit residual.
fn fit_ctmp(counts: &[OutcomeCounts], metadata: &CalibrationMetadata) -> Result<CtmpModel> {
    let n = metadata.num_qubits();
    let mut residual = 0.0f64;
    let mut rates: Vec<(Generator, f64)> = Vec::new();

    if n == 1 {
        let g = empirical_assignment_matrix(counts, metadata, &[0]).logm()?;
        for (from, to) in [(0u8, 1u8), (1u8, 0u8)] {
            let estimate = g.get(to as usize, from as usize);
            push_rate(
                &mut rates,
                &mut residual,
                Generator::Single { qubit: 0, from, to },
                estimate,
            );
        }
        return Ok(CtmpModel::new(n, rates, residual));
    }

    // Per-qubit single-flip accumulators: [0->1, 1->0].
    let mut single_sum = vec![[0.0f64; 2]; n];
    let mut single_count = vec![[0u32; 2]; n];

    for j in 0..n {
        for k in (j + 1)..n {
            let g = empirical_assignment_matrix(counts, metadata, &[j, k]).logm()?;

            // Pair channels: both bits flip. Bit 0 of a state index is
            // qubit j, bit 1 is qubit k.
            for (from, to) in [(0u8, 3u8), (3u8, 0u8), (1u8, 2u8), (2u8, 1u8)] {
                let estimate = g.get(to as usize, from as usize);
                push_rate(
                    &mut rates,
                    &mut residual,
                    Generator::Pair { qubits: (j, k), from, to },
                    estimate,
                );
            }

            // Single-flip entries, averaged over the spectator bit.
            for s in [0usize, 2] {
                single_sum[j][0] += g.get(s | 1, s);
                single_count[j][0] += 1;
            }
            for s in [1usize, 3] {
                single_sum[j][1] += g.get(s & !1, s);
                single_count[j][1] += 1;
            }
            for s in [0usize, 1] {
                single_sum[k][0] += g.get(s | 2, s);
                single_count[k][0] += 1;
            }
            for s in [2usize, 3] {
                single_sum[k][1] += g.get(s & !2, s);
                single_count[k][1] += 1;
            }
        }
    }

    for qubit in 0..n {
        for (dir, (from, to)) in [(0u8, 1u8), (1u8, 0u8)].into_iter().enumerate() {
            let estimate = single_sum[qubit][dir] / single_count[qubit][dir] as f64;
            push_rate(
                &mut rates,
                &mut residual,
                Generator::Single { qubit, from, to },
                estimate,
            );
        }
    }

    Ok(CtmpModel::new(n, rates, residual))
}

/// Record a rate estimate, clipping negatives into the residual.
fn push_rate(
    rates: &mut Vec<(Generator, f64)>,
    residual: &mut f64,
    generator: Generator,
    estimate: f64,
) {
    if estimate > 0.0 {
        rates.push((generator, estimate));
    } else {
        *residual += estimate.abs();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
