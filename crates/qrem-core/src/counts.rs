//! Measurement outcome histograms.
//!
//! One [`OutcomeCounts`] per executed circuit: a map from measured bit-string
//! to a non-negative count, summing to the shot count. Bit order matches
//! calibration labels — the rightmost character is qubit 0.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Histogram of measured bit-strings for a single circuit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    num_qubits: usize,
    counts: HashMap<String, u64>,
}

impl OutcomeCounts {
    /// Empty histogram over `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            counts: HashMap::new(),
        }
    }

    /// Build from an existing outcome map.
    pub fn from_map(num_qubits: usize, counts: HashMap<String, u64>) -> Self {
        Self { num_qubits, counts }
    }

    /// Qubit width of the recorded outcomes.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Add `count` observations of `outcome`.
    pub fn record(&mut self, outcome: &str, count: u64) {
        *self.counts.entry(outcome.to_string()).or_insert(0) += count;
    }

    /// Total observed shots.
    pub fn total_shots(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Count for a specific outcome (0 when never observed).
    pub fn count(&self, outcome: &str) -> u64 {
        self.counts.get(outcome).copied().unwrap_or(0)
    }

    /// Empirical probability of an outcome.
    pub fn probability(&self, outcome: &str) -> f64 {
        let total = self.total_shots();
        if total == 0 {
            0.0
        } else {
            self.count(outcome) as f64 / total as f64
        }
    }

    /// Iterate over (outcome, count) pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// True when every recorded outcome string has the declared width and
    /// contains only `{0,1}` characters.
    pub fn outcomes_well_formed(&self) -> bool {
        self.counts.keys().all(|outcome| {
            outcome.len() == self.num_qubits && outcome.bytes().all(|b| b == b'0' || b == b'1')
        })
    }

    /// Marginalize onto an ordered qubit subset, summing counts over the
    /// complementary qubits.
    ///
    /// Bit `i` of a marginal outcome corresponds to `qubits[i]`. The caller
    /// validates the subset; out-of-range indices here would panic.
    pub fn marginalize(&self, qubits: &[usize]) -> OutcomeCounts {
        let mut marginal = OutcomeCounts::new(qubits.len());
        for (outcome, count) in &self.counts {
            let key = restrict_bitstring(outcome, qubits);
            *marginal.counts.entry(key).or_insert(0) += count;
        }
        marginal
    }

    /// Dense probability vector indexed by basis-state integer.
    ///
    /// Bit `q` of the index corresponds to qubit `q`. Intended for small
    /// subsets; allocates `2^num_qubits` entries.
    pub fn probability_vector(&self) -> Vec<f64> {
        let dim = 1usize << self.num_qubits;
        let total = self.total_shots();
        let mut probs = vec![0.0; dim];
        if total == 0 {
            return probs;
        }
        for (outcome, count) in &self.counts {
            probs[bitstring_index(outcome)] += *count as f64 / total as f64;
        }
        probs
    }
}

/// Restrict a bit-string to the given qubits, preserving subset order.
///
/// Bit `i` of the result (i.e. the `i`-th character from the right)
/// corresponds to `qubits[i]` of the input.
pub fn restrict_bitstring(outcome: &str, qubits: &[usize]) -> String {
    let n = outcome.len();
    let bytes = outcome.as_bytes();
    let k = qubits.len();
    let mut restricted = vec![b'0'; k];
    for (i, &q) in qubits.iter().enumerate() {
        restricted[k - 1 - i] = bytes[n - 1 - q];
    }
    String::from_utf8(restricted).expect("bits are ASCII")
}

/// Integer index of a bit-string (rightmost character is bit 0).
pub fn bitstring_index(outcome: &str) -> usize {
    outcome
        .bytes()
        .fold(0usize, |acc, b| (acc << 1) | (b == b'1') as usize)
}

/// Bit-string of `width` characters for a basis-state integer.
pub fn index_bitstring(index: usize, width: usize) -> String {
    let mut bits = vec![b'0'; width];
    for (q, bit) in bits.iter_mut().rev().enumerate() {
        if index >> q & 1 == 1 {
            *bit = b'1';
        }
    }
    String::from_utf8(bits).expect("bits are ASCII")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_totals() {
        let mut counts = OutcomeCounts::new(2);
        counts.record("00", 70);
        counts.record("11", 20);
        counts.record("00", 10);
        assert_eq!(counts.total_shots(), 100);
        assert_eq!(counts.count("00"), 80);
        assert!((counts.probability("11") - 0.2).abs() < 1e-12);
    }

    #[test]
    fn bitstring_round_trip() {
        assert_eq!(bitstring_index("0110"), 6);
        assert_eq!(index_bitstring(6, 4), "0110");
        for i in 0..16 {
            assert_eq!(bitstring_index(&index_bitstring(i, 4)), i);
        }
    }

    #[test]
    fn restrict_preserves_subset_order() {
        // "0110": qubit 0 = '0', qubit 1 = '1', qubit 2 = '1', qubit 3 = '0'.
        assert_eq!(restrict_bitstring("0110", &[1, 2]), "11");
        assert_eq!(restrict_bitstring("0110", &[0, 3]), "00");
        assert_eq!(restrict_bitstring("0110", &[2, 0]), "01");
        assert_eq!(restrict_bitstring("0110", &[0, 2]), "10");
    }

    #[test]
    fn marginalize_sums_complement() {
        let mut counts = OutcomeCounts::new(3);
        counts.record("000", 40);
        counts.record("100", 30);
        counts.record("001", 20);
        counts.record("101", 10);
        let marginal = counts.marginalize(&[0]);
        assert_eq!(marginal.num_qubits(), 1);
        assert_eq!(marginal.count("0"), 70);
        assert_eq!(marginal.count("1"), 30);
        assert_eq!(marginal.total_shots(), counts.total_shots());
    }

    #[test]
    fn probability_vector_indexing() {
        let mut counts = OutcomeCounts::new(2);
        counts.record("01", 25); // qubit 0 measured 1 -> index 1
        counts.record("10", 75); // qubit 1 measured 1 -> index 2
        let probs = counts.probability_vector();
        assert!((probs[1] - 0.25).abs() < 1e-12);
        assert!((probs[2] - 0.75).abs() < 1e-12);
        assert_eq!(probs[0], 0.0);
    }

    #[test]
    fn well_formed_outcomes() {
        let mut counts = OutcomeCounts::new(2);
        counts.record("01", 1);
        assert!(counts.outcomes_well_formed());
        counts.record("012", 1);
        assert!(!counts.outcomes_well_formed());
    }
}
