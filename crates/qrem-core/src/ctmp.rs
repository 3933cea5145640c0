//! Continuous-time Markov process (CTMP) readout error model.
//!
//! Readout noise is modelled as `A = exp(G)` where `G` is a sum of local
//! error generators — single-qubit flips and two-qubit correlated flips —
//! weighted by non-negative rates. Each generator `b -> a` contributes
//! `r (|a⟩⟨b| - |b⟩⟨b|)` on its support, so every column of `G` sums to zero
//! and `exp(G)` is column-stochastic with non-negative entries by
//! construction.
//!
//! The payoff over the direct assignment-matrix estimate is scaling: the
//! model is stored as O(N²) rates and any qubit-subset assignment matrix is
//! reconstructed by embedding the subset's generators into 2^k dimensions
//! and exponentiating. No 2^N object is ever materialised.

use serde::{Deserialize, Serialize};

use crate::matrix::Matrix;

/// A local error generator: a flip channel `from -> to` on one or two qubits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Generator {
    /// Single-qubit readout flip. `from` and `to` are single bits.
    Single {
        /// Affected qubit.
        qubit: usize,
        /// Prepared bit value.
        from: u8,
        /// Measured bit value.
        to: u8,
    },
    /// Correlated two-qubit flip: both bits change together. `from` and `to`
    /// are two-bit patterns, bit 0 of which refers to `qubits.0`.
    Pair {
        /// Affected qubit pair, low index first.
        qubits: (usize, usize),
        /// Prepared two-bit pattern.
        from: u8,
        /// Measured two-bit pattern.
        to: u8,
    },
}

impl Generator {
    /// Qubits the generator acts on.
    pub fn support(&self) -> Vec<usize> {
        match self {
            Generator::Single { qubit, .. } => vec![*qubit],
            Generator::Pair { qubits, .. } => vec![qubits.0, qubits.1],
        }
    }
}

impl std::fmt::Display for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Generator::Single { qubit, from, to } => {
                write!(f, "q{qubit}: {from}->{to}")
            }
            Generator::Pair { qubits, from, to } => {
                write!(
                    f,
                    "q{},q{}: {:02b}->{:02b}",
                    qubits.0, qubits.1, from, to
                )
            }
        }
    }
}

/// Fitted CTMP model: generator rates plus fit diagnostics.
///
/// Immutable after fitting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtmpModel {
    num_qubits: usize,
    rates: Vec<(Generator, f64)>,
    fit_residual: f64,
}

impl CtmpModel {
    pub(crate) fn new(num_qubits: usize, rates: Vec<(Generator, f64)>, fit_residual: f64) -> Self {
        Self {
            num_qubits,
            rates,
            fit_residual,
        }
    }

    /// Qubit count the model was fitted over.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Fitted generator rates (strictly positive entries only).
    pub fn rates(&self) -> &[(Generator, f64)] {
        &self.rates
    }

    /// Negative-rate mass clipped to satisfy the non-negativity constraint.
    /// Small values mean the generator model explains the data well.
    pub fn fit_residual(&self) -> f64 {
        self.fit_residual
    }

    /// Sum of all fitted rates.
    pub fn total_rate(&self) -> f64 {
        self.rates.iter().map(|(_, r)| r).sum()
    }

    /// Generator matrix restricted to an ordered qubit subset.
    ///
    /// Embeds every generator whose support lies inside the subset into
    /// 2^k dimensions; generators straddling the subset boundary do not
    /// contribute. Bit `i` of a basis-state index refers to `qubits[i]`.
    /// The caller validates the subset.
    pub fn subset_generator(&self, qubits: &[usize]) -> Matrix {
        let k = qubits.len();
        let dim = 1usize << k;
        let mut position = vec![None; self.num_qubits];
        for (i, &q) in qubits.iter().enumerate() {
            position[q] = Some(i);
        }

        let mut g = Matrix::zeros(dim);
        for &(generator, rate) in &self.rates {
            match generator {
                Generator::Single { qubit, from, to } => {
                    let Some(i) = position[qubit] else { continue };
                    for b in 0..dim {
                        if (b >> i) & 1 != from as usize {
                            continue;
                        }
                        let a = (b & !(1 << i)) | ((to as usize) << i);
                        g.add(a, b, rate);
                        g.add(b, b, -rate);
                    }
                }
                Generator::Pair { qubits: (q0, q1), from, to } => {
                    let (Some(i0), Some(i1)) = (position[q0], position[q1]) else {
                        continue;
                    };
                    for b in 0..dim {
                        let pattern = ((b >> i0) & 1) | (((b >> i1) & 1) << 1);
                        if pattern != from as usize {
                            continue;
                        }
                        let mut a = b & !(1 << i0) & !(1 << i1);
                        a |= ((to as usize) & 1) << i0;
                        a |= (((to as usize) >> 1) & 1) << i1;
                        g.add(a, b, rate);
                        g.add(b, b, -rate);
                    }
                }
            }
        }
        g
    }

    /// Assignment matrix `exp(G_S)` for an ordered qubit subset.
    pub fn assignment_matrix(&self, qubits: &[usize]) -> Matrix {
        self.subset_generator(qubits).expm()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
