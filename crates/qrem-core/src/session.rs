//! Calibration run recording.
//!
//! A run bundles the raw material a fit needs — labels and per-circuit
//! outcome counts — with provenance (backend name, shot count, timestamp,
//! id) so hardware time is spent once and fits can replay saved data.
//!
//! # Storage format
//!
//! One JSON file per run. Only raw calibration data is persisted; fitted
//! mitigators are cheap to rebuild and are never saved.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calibration::CalibrationMetadata;
use crate::counts::OutcomeCounts;
use crate::error::Result;

/// Current run file format version.
pub const RUN_FORMAT_VERSION: u32 = 1;

/// A recorded calibration run: metadata plus raw counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRun {
    /// File format version.
    pub version: u32,
    /// Random id assigned at creation.
    pub id: String,
    /// Creation time, seconds since the unix epoch.
    pub created_unix: u64,
    /// Name of the backend that produced the counts.
    pub backend: String,
    /// Qubit count.
    pub num_qubits: usize,
    /// Shots requested per circuit.
    pub shots: u64,
    /// Prepared-state labels, one per circuit, in circuit order.
    pub labels: Vec<String>,
    /// Outcome histograms, aligned with `labels`.
    pub counts: Vec<OutcomeCounts>,
}

impl CalibrationRun {
    /// Record a run from executed calibration data.
    pub fn new(
        backend: &str,
        metadata: &CalibrationMetadata,
        shots: u64,
        counts: Vec<OutcomeCounts>,
    ) -> Self {
        Self {
            version: RUN_FORMAT_VERSION,
            id: Uuid::new_v4().to_string(),
            created_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            backend: backend.to_string(),
            num_qubits: metadata.num_qubits(),
            shots,
            labels: metadata.labels().iter().map(|l| l.as_str().to_string()).collect(),
            counts,
        }
    }

    /// Rebuild validated metadata from the stored labels.
    pub fn metadata(&self) -> Result<CalibrationMetadata> {
        let refs: Vec<&str> = self.labels.iter().map(|s| s.as_str()).collect();
        CalibrationMetadata::new(self.num_qubits, &refs)
    }

    /// Write the run as JSON.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    /// Load a run from JSON, rejecting unknown format versions.
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let run: CalibrationRun = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if run.version != RUN_FORMAT_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "unsupported run format version {} (expected {})",
                    run.version, RUN_FORMAT_VERSION
                ),
            ));
        }
        Ok(run)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ReadoutBackend;
    use crate::calibration::{generate_calibration, standard_labels};
    use crate::sim::NoisySimulator;

    fn recorded_run() -> CalibrationRun {
        let labels = standard_labels(3);
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let (circuits, metadata) = generate_calibration(3, &refs).unwrap();
        let backend = NoisySimulator::ideal(3, 11);
        let counts = backend.execute(&circuits, 256).unwrap();
        CalibrationRun::new(backend.name(), &metadata, 256, counts)
    }

    #[test]
    fn save_load_round_trip() {
        let run = recorded_run();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        run.save(&path).unwrap();
        let loaded = CalibrationRun::load(&path).unwrap();
        assert_eq!(loaded.id, run.id);
        assert_eq!(loaded.labels, run.labels);
        assert_eq!(loaded.counts, run.counts);
        assert_eq!(loaded.backend, "noisy_sim");
    }

    #[test]
    fn metadata_round_trip() {
        let run = recorded_run();
        let metadata = run.metadata().unwrap();
        assert_eq!(metadata.num_qubits(), 3);
        assert_eq!(metadata.len(), run.counts.len());
    }

    #[test]
    fn load_rejects_wrong_version() {
        let mut run = recorded_run();
        run.version = 99;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        run.save(&path).unwrap();
        let err = CalibrationRun::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
