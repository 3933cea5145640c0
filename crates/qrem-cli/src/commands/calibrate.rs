use std::path::Path;
use std::time::Instant;

use qrem_core::backend::ReadoutBackend;
use qrem_core::calibration::{generate_calibration, standard_labels};
use qrem_core::session::CalibrationRun;
use qrem_core::sim::{NoisySimulator, ReadoutNoise};

pub struct CalibrateConfig<'a> {
    pub qubits: usize,
    pub mode: &'a str,
    pub input: Option<&'a str>,
    pub shots: u64,
    pub p01: f64,
    pub p10: f64,
    pub correlated: f64,
    pub seed: u64,
    pub output: &'a str,
}

pub fn run(config: CalibrateConfig) {
    match config.mode {
        "simulate" => simulate(&config),
        "replay" => replay(&config),
        other => {
            eprintln!("Unknown mode '{other}', expected simulate or replay.");
            std::process::exit(1);
        }
    }
}

fn simulate(config: &CalibrateConfig) {
    if config.qubits == 0 {
        eprintln!("Qubit count must be at least 1.");
        std::process::exit(1);
    }
    for (name, p) in [
        ("p01", config.p01),
        ("p10", config.p10),
        ("correlated", config.correlated),
    ] {
        if !(0.0..=1.0).contains(&p) {
            eprintln!("{name} must be in [0, 1], got {p}");
            std::process::exit(1);
        }
    }

    let labels = standard_labels(config.qubits);
    let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
    let (circuits, metadata) = match generate_calibration(config.qubits, &refs) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Failed to build calibration circuits: {e}");
            std::process::exit(1);
        }
    };

    let noise = ReadoutNoise::uniform(config.qubits, config.p01, config.p10)
        .with_correlated(config.correlated);
    let backend = NoisySimulator::new(noise, config.seed);

    println!(
        "🔬 Executing {} calibration circuit(s) on {} ({} shots each)...",
        circuits.len(),
        backend.name(),
        config.shots
    );

    let t0 = Instant::now();
    let counts = match backend.execute(&circuits, config.shots) {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!("Execution failed: {e}");
            std::process::exit(1);
        }
    };
    let elapsed = t0.elapsed().as_secs_f64();

    let record = CalibrationRun::new(backend.name(), &metadata, config.shots, counts);
    save(&record, config.output);
    println!(
        "  {} circuits × {} shots in {elapsed:.2}s",
        record.counts.len(),
        config.shots
    );
    println!("📄 Run {} saved to: {}", record.id, config.output);
}

/// Re-validate a saved run and re-record it under a fresh id.
fn replay(config: &CalibrateConfig) {
    let Some(input) = config.input else {
        eprintln!("--mode replay requires --input <saved run>.");
        std::process::exit(1);
    };
    let saved = super::load_run(input);
    let metadata = match saved.metadata() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Saved run has invalid calibration labels: {e}");
            std::process::exit(1);
        }
    };
    if saved.num_qubits != config.qubits {
        eprintln!(
            "Saved run covers {} qubit(s), expected {}.",
            saved.num_qubits, config.qubits
        );
        std::process::exit(1);
    }

    println!(
        "🔁 Replaying run {} ({} circuits from {})...",
        saved.id,
        saved.counts.len(),
        saved.backend
    );
    let record = CalibrationRun::new(&saved.backend, &metadata, saved.shots, saved.counts.clone());
    save(&record, config.output);
    println!("📄 Run {} saved to: {}", record.id, config.output);
}

fn save(record: &CalibrationRun, output: &str) {
    if let Err(e) = record.save(Path::new(output)) {
        eprintln!("Failed to save run to {output}: {e}");
        std::process::exit(1);
    }
}
