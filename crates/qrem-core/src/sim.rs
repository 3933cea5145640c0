//! Seeded readout noise simulator.
//!
//! Implements [`ReadoutBackend`] by sampling per-shot bit flips: each qubit
//! has asymmetric flip probabilities (`p01` for a prepared 0 read as 1,
//! `p10` for the reverse), and adjacent qubit pairs can additionally flip
//! together at a correlated rate — the kind of error the CTMP pair
//! generators exist to capture.
//!
//! Deterministic for a fixed seed: every `execute` call derives its RNG
//! stream from the configured seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::backend::{BackendInfo, ReadoutBackend, check_circuits};
use crate::calibration::CalibrationCircuit;
use crate::counts::OutcomeCounts;
use crate::error::Result;

/// Per-qubit readout flip probabilities plus an optional correlated term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadoutNoise {
    /// P(measure 1 | prepared 0), per qubit.
    pub p01: Vec<f64>,
    /// P(measure 0 | prepared 1), per qubit.
    pub p10: Vec<f64>,
    /// Probability of a simultaneous double flip on each adjacent qubit
    /// pair, applied after the independent flips.
    pub correlated: f64,
}

impl ReadoutNoise {
    /// Noise-free configuration.
    pub fn ideal(num_qubits: usize) -> Self {
        Self {
            p01: vec![0.0; num_qubits],
            p10: vec![0.0; num_qubits],
            correlated: 0.0,
        }
    }

    /// The same flip probabilities on every qubit.
    pub fn uniform(num_qubits: usize, p01: f64, p10: f64) -> Self {
        Self {
            p01: vec![p01; num_qubits],
            p10: vec![p10; num_qubits],
            correlated: 0.0,
        }
    }

    /// Add a correlated double-flip rate on adjacent pairs.
    pub fn with_correlated(mut self, rate: f64) -> Self {
        self.correlated = rate;
        self
    }

    /// Qubit count the configuration covers.
    pub fn num_qubits(&self) -> usize {
        self.p01.len()
    }
}

/// Readout noise simulator backend.
pub struct NoisySimulator {
    info: BackendInfo,
    noise: ReadoutNoise,
    seed: u64,
}

impl NoisySimulator {
    /// Simulator with the given noise configuration and RNG seed.
    pub fn new(noise: ReadoutNoise, seed: u64) -> Self {
        Self {
            info: BackendInfo {
                name: "noisy_sim",
                description: "seeded per-qubit readout flip sampler with correlated pair errors",
                num_qubits: noise.num_qubits(),
            },
            noise,
            seed,
        }
    }

    /// Noise-free simulator (useful as a baseline in tests).
    pub fn ideal(num_qubits: usize, seed: u64) -> Self {
        Self::new(ReadoutNoise::ideal(num_qubits), seed)
    }

    /// The configured noise model.
    pub fn noise(&self) -> &ReadoutNoise {
        &self.noise
    }

    fn sample_circuit(
        &self,
        circuit: &CalibrationCircuit,
        shots: u64,
        rng: &mut StdRng,
    ) -> OutcomeCounts {
        let n = circuit.num_qubits();
        let prepared = circuit.prepared_state();
        let prepared_bits: Vec<bool> = (0..n)
            .map(|q| prepared.as_bytes()[n - 1 - q] == b'1')
            .collect();

        let mut counts = OutcomeCounts::new(n);
        let mut measured = vec![false; n];
        for _ in 0..shots {
            for q in 0..n {
                let flip_p = if prepared_bits[q] {
                    self.noise.p10[q]
                } else {
                    self.noise.p01[q]
                };
                let flipped = flip_p > 0.0 && rng.random::<f64>() < flip_p;
                measured[q] = prepared_bits[q] ^ flipped;
            }
            if self.noise.correlated > 0.0 {
                for q in 0..n.saturating_sub(1) {
                    if rng.random::<f64>() < self.noise.correlated {
                        measured[q] = !measured[q];
                        measured[q + 1] = !measured[q + 1];
                    }
                }
            }
            let mut outcome = vec![b'0'; n];
            for q in 0..n {
                if measured[q] {
                    outcome[n - 1 - q] = b'1';
                }
            }
            counts.record(
                std::str::from_utf8(&outcome).expect("bits are ASCII"),
                1,
            );
        }
        counts
    }
}

impl ReadoutBackend for NoisySimulator {
    fn info(&self) -> &BackendInfo {
        &self.info
    }

    fn execute(&self, circuits: &[CalibrationCircuit], shots: u64) -> Result<Vec<OutcomeCounts>> {
        check_circuits(circuits, self.info.num_qubits)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        Ok(circuits
            .iter()
            .map(|circuit| self.sample_circuit(circuit, shots, &mut rng))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{generate_calibration, standard_labels};

    fn circuits_for(n: usize) -> Vec<CalibrationCircuit> {
        let labels = standard_labels(n);
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        generate_calibration(n, &refs).unwrap().0
    }

    #[test]
    fn ideal_backend_reproduces_labels() {
        let circuits = circuits_for(4);
        let backend = NoisySimulator::ideal(4, 7);
        let results = backend.execute(&circuits, 512).unwrap();
        assert_eq!(results.len(), circuits.len());
        for (circuit, counts) in circuits.iter().zip(&results) {
            assert_eq!(counts.total_shots(), 512);
            assert_eq!(counts.count(&circuit.prepared_state()), 512);
        }
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let circuits = circuits_for(3);
        let noise = ReadoutNoise::uniform(3, 0.05, 0.1);
        let a = NoisySimulator::new(noise.clone(), 42)
            .execute(&circuits, 2000)
            .unwrap();
        let b = NoisySimulator::new(noise, 42).execute(&circuits, 2000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn flip_rates_roughly_match_configuration() {
        let circuits = circuits_for(2);
        let noise = ReadoutNoise::uniform(2, 0.1, 0.0);
        let backend = NoisySimulator::new(noise, 1234);
        let results = backend.execute(&circuits, 50_000).unwrap();
        // First circuit prepares "00"; qubit 0 should read 1 about 10% of
        // the time.
        let marginal = results[0].marginalize(&[0]);
        let p1 = marginal.probability("1");
        assert!((p1 - 0.1).abs() < 0.01, "p1 = {p1}");
    }

    #[test]
    fn rejects_mismatched_circuit_width() {
        let circuits = circuits_for(3);
        let backend = NoisySimulator::ideal(2, 0);
        assert!(backend.execute(&circuits, 10).is_err());
    }

    #[test]
    fn correlated_flips_show_up_on_pairs() {
        let circuits = circuits_for(2);
        let noise = ReadoutNoise::ideal(2).with_correlated(0.05);
        let backend = NoisySimulator::new(noise, 99);
        let results = backend.execute(&circuits, 50_000).unwrap();
        // Prepared "00": only the correlated channel produces "11".
        let p11 = results[0].probability("11");
        assert!((p11 - 0.05).abs() < 0.01, "p11 = {p11}");
        assert_eq!(results[0].count("01"), 0);
        assert_eq!(results[0].count("10"), 0);
    }
}
