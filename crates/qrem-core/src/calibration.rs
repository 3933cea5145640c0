//! Calibration circuit and metadata generation.
//!
//! A calibration run prepares a set of computational-basis states, one per
//! circuit, and measures every qubit. The prepared states are described by
//! bit-string labels; the fitter later keys raw outcome counts by these
//! labels to estimate readout error.
//!
//! Bit order: the rightmost character of a label is qubit 0. `"0011"` on four
//! qubits prepares qubits 0 and 1 in |1⟩.

use serde::{Deserialize, Serialize};

use crate::error::{MitigationError, Result};

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

/// A validated bit-string label denoting the basis state a calibration
/// circuit prepares.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationLabel(String);

impl CalibrationLabel {
    /// Validate a label against the expected qubit count.
    pub fn new(label: &str, num_qubits: usize) -> Result<Self> {
        if label.len() != num_qubits {
            return Err(MitigationError::InvalidLabel(format!(
                "label '{label}' has length {}, expected {num_qubits}",
                label.len()
            )));
        }
        if let Some(c) = label.chars().find(|c| *c != '0' && *c != '1') {
            return Err(MitigationError::InvalidLabel(format!(
                "label '{label}' contains '{c}', only '0' and '1' are allowed"
            )));
        }
        Ok(Self(label.to_string()))
    }

    /// The label as a bit-string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of qubits the label covers.
    pub fn num_qubits(&self) -> usize {
        self.0.len()
    }

    /// Whether `qubit` is prepared in |1⟩.
    pub fn bit(&self, qubit: usize) -> bool {
        let n = self.0.len();
        self.0.as_bytes()[n - 1 - qubit] == b'1'
    }

    /// Hamming weight (number of qubits prepared in |1⟩).
    pub fn weight(&self) -> usize {
        self.0.bytes().filter(|b| *b == b'1').count()
    }

    /// Qubits prepared in |1⟩, ascending.
    pub fn excited_qubits(&self) -> Vec<usize> {
        (0..self.num_qubits()).filter(|q| self.bit(*q)).collect()
    }
}

impl std::fmt::Display for CalibrationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Ordered label list, one entry per generated circuit.
///
/// Invariant: labels are distinct, non-empty, and share one qubit width. The
/// i-th entry describes the state prepared by the i-th circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMetadata {
    num_qubits: usize,
    labels: Vec<CalibrationLabel>,
}

impl CalibrationMetadata {
    /// Build metadata from raw label strings, validating each.
    pub fn new(num_qubits: usize, labels: &[&str]) -> Result<Self> {
        if labels.is_empty() {
            return Err(MitigationError::InvalidLabel(
                "calibration label set is empty".to_string(),
            ));
        }
        let mut validated = Vec::with_capacity(labels.len());
        for label in labels {
            let label = CalibrationLabel::new(label, num_qubits)?;
            if validated.contains(&label) {
                return Err(MitigationError::InvalidLabel(format!(
                    "duplicate label '{label}'"
                )));
            }
            validated.push(label);
        }
        Ok(Self {
            num_qubits,
            labels: validated,
        })
    }

    /// Qubit width shared by every label.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Number of calibration circuits described.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when no circuits are described (never constructible via `new`).
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label for circuit `index`.
    pub fn label(&self, index: usize) -> &CalibrationLabel {
        &self.labels[index]
    }

    /// All labels, in circuit order.
    pub fn labels(&self) -> &[CalibrationLabel] {
        &self.labels
    }
}

// ---------------------------------------------------------------------------
// Circuits
// ---------------------------------------------------------------------------

/// A basis-state preparation circuit: X gates on the excited qubits followed
/// by a full measurement.
///
/// Purely a description — execution belongs to the
/// [`crate::backend::ReadoutBackend`] collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCircuit {
    num_qubits: usize,
    x_qubits: Vec<usize>,
}

impl CalibrationCircuit {
    /// Circuit preparing the given label's basis state.
    pub fn for_label(label: &CalibrationLabel) -> Self {
        Self {
            num_qubits: label.num_qubits(),
            x_qubits: label.excited_qubits(),
        }
    }

    /// Qubit count of the circuit.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Qubits receiving an X gate, ascending.
    pub fn x_qubits(&self) -> &[usize] {
        &self.x_qubits
    }

    /// The basis state this circuit prepares, as a bit-string.
    pub fn prepared_state(&self) -> String {
        let mut bits = vec![b'0'; self.num_qubits];
        for &q in &self.x_qubits {
            bits[self.num_qubits - 1 - q] = b'1';
        }
        String::from_utf8(bits).expect("bits are ASCII")
    }
}

/// Generate one circuit per label plus the label-to-circuit-index metadata.
///
/// Deterministic: the i-th circuit prepares exactly the i-th label's state.
pub fn generate_calibration(
    num_qubits: usize,
    labels: &[&str],
) -> Result<(Vec<CalibrationCircuit>, CalibrationMetadata)> {
    let metadata = CalibrationMetadata::new(num_qubits, labels)?;
    let circuits = metadata
        .labels()
        .iter()
        .map(CalibrationCircuit::for_label)
        .collect();
    Ok((circuits, metadata))
}

/// Standard calibration label set: all-zeros, all-ones, and every
/// Hamming-weight-2 string.
///
/// This gives every qubit pair all four prepared states, which is what the
/// pair-generator rate fit needs. For fewer than three qubits the weight-1
/// strings are added so single-qubit error rates stay identifiable.
pub fn standard_labels(num_qubits: usize) -> Vec<String> {
    let mut labels = Vec::new();
    labels.push("0".repeat(num_qubits));
    if num_qubits < 3 {
        for q in 0..num_qubits {
            let mut bits = vec![b'0'; num_qubits];
            bits[num_qubits - 1 - q] = b'1';
            labels.push(String::from_utf8(bits).expect("bits are ASCII"));
        }
    }
    for j in 0..num_qubits {
        for k in (j + 1)..num_qubits {
            let mut bits = vec![b'0'; num_qubits];
            bits[num_qubits - 1 - j] = b'1';
            bits[num_qubits - 1 - k] = b'1';
            labels.push(String::from_utf8(bits).expect("bits are ASCII"));
        }
    }
    // For two qubits the pair loop already produced the all-ones string.
    if num_qubits > 2 {
        labels.push("1".repeat(num_qubits));
    }
    labels
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_validation() {
        assert!(CalibrationLabel::new("0011", 4).is_ok());
        assert!(matches!(
            CalibrationLabel::new("001", 4),
            Err(MitigationError::InvalidLabel(_))
        ));
        assert!(matches!(
            CalibrationLabel::new("0021", 4),
            Err(MitigationError::InvalidLabel(_))
        ));
    }

    #[test]
    fn label_bit_order() {
        let label = CalibrationLabel::new("0011", 4).unwrap();
        assert!(label.bit(0));
        assert!(label.bit(1));
        assert!(!label.bit(2));
        assert!(!label.bit(3));
        assert_eq!(label.weight(), 2);
        assert_eq!(label.excited_qubits(), vec![0, 1]);
    }

    #[test]
    fn metadata_rejects_duplicates() {
        let err = CalibrationMetadata::new(2, &["01", "01"]).unwrap_err();
        assert!(matches!(err, MitigationError::InvalidLabel(_)));
    }

    #[test]
    fn metadata_rejects_empty_set() {
        assert!(CalibrationMetadata::new(2, &[]).is_err());
    }

    #[test]
    fn generator_matches_labels() {
        let labels = ["0000", "0011", "1100"];
        let (circuits, metadata) = generate_calibration(4, &labels).unwrap();
        assert_eq!(circuits.len(), labels.len());
        for (i, circuit) in circuits.iter().enumerate() {
            assert_eq!(circuit.prepared_state(), metadata.label(i).as_str());
        }
        assert_eq!(circuits[1].x_qubits(), &[0, 1]);
        assert_eq!(circuits[2].x_qubits(), &[2, 3]);
    }

    #[test]
    fn standard_labels_four_qubits() {
        let labels = standard_labels(4);
        // all-0, six weight-2 strings, all-1
        assert_eq!(labels.len(), 8);
        assert!(labels.contains(&"0000".to_string()));
        assert!(labels.contains(&"0011".to_string()));
        assert!(labels.contains(&"0101".to_string()));
        assert!(labels.contains(&"1001".to_string()));
        assert!(labels.contains(&"0110".to_string()));
        assert!(labels.contains(&"1010".to_string()));
        assert!(labels.contains(&"1100".to_string()));
        assert!(labels.contains(&"1111".to_string()));
    }

    #[test]
    fn standard_labels_cover_every_pair_state() {
        let num_qubits = 5;
        let labels = standard_labels(num_qubits);
        let parsed: Vec<CalibrationLabel> = labels
            .iter()
            .map(|l| CalibrationLabel::new(l, num_qubits).unwrap())
            .collect();
        for j in 0..num_qubits {
            for k in (j + 1)..num_qubits {
                let mut seen = [false; 4];
                for label in &parsed {
                    let state = (label.bit(j) as usize) | ((label.bit(k) as usize) << 1);
                    seen[state] = true;
                }
                assert!(seen.iter().all(|s| *s), "pair ({j},{k}) not covered");
            }
        }
    }

    #[test]
    fn standard_labels_two_qubits_include_weight_one() {
        let labels = standard_labels(2);
        assert!(labels.contains(&"01".to_string()));
        assert!(labels.contains(&"10".to_string()));
    }
}
