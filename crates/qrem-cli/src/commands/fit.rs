use serde::Serialize;

/// Machine-readable fit summary written with `--output`.
#[derive(Serialize)]
struct FitReport {
    run_id: String,
    backend: String,
    num_qubits: usize,
    shots: u64,
    method: &'static str,
    fit_residual: Option<f64>,
    single_qubit_fidelities: Vec<f64>,
    generators: Vec<GeneratorEntry>,
}

#[derive(Serialize)]
struct GeneratorEntry {
    channel: String,
    rate: f64,
}

pub fn run(run_path: &str, method: &str, subset: Option<&str>, output_path: Option<&str>) {
    let record = super::load_run(run_path);
    let method = super::parse_method(method);
    let mitigator = super::fit_from_run(&record, method);
    let n = mitigator.num_qubits();

    println!(
        "Fitted {} mitigator over {n} qubit(s) from run {} ({} circuits, {} shots each)\n",
        mitigator.method(),
        record.id,
        record.counts.len(),
        record.shots
    );

    let mut fidelities = Vec::with_capacity(n);
    println!("{:<8} {:>10}", "Qubit", "Fidelity");
    println!("{}", "-".repeat(20));
    for q in 0..n {
        match mitigator.assignment_fidelity(&[q]) {
            Ok(f) => {
                println!("{q:<8} {f:>10.5}");
                fidelities.push(f);
            }
            Err(e) => {
                eprintln!("Fidelity query failed for qubit {q}: {e}");
                std::process::exit(1);
            }
        }
    }

    if let Some(residual) = mitigator.fit_residual() {
        println!("\nClipped-rate residual: {residual:.4e}");
    }

    let mut generators = Vec::new();
    if let Some(model) = mitigator.ctmp_model() {
        println!("\nGenerator rates ({}):", model.rates().len());
        for (generator, rate) in model.rates() {
            let channel = generator.to_string();
            println!("  {channel:<24} {rate:>10.6}");
            generators.push(GeneratorEntry { channel, rate: *rate });
        }
    }

    if let Some(list) = subset {
        let qubits = match super::parse_subset(list) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("Bad subset '{list}': {e}");
                std::process::exit(1);
            }
        };
        match mitigator.assignment_matrix(&qubits) {
            Ok(matrix) => {
                println!("\nAssignment matrix P(measured | prepared) on qubits {qubits:?}:");
                super::print_matrix(&matrix, qubits.len());
            }
            Err(e) => {
                eprintln!("Subset query failed: {e}");
                std::process::exit(1);
            }
        }
    }

    if let Some(path) = output_path {
        let report = FitReport {
            run_id: record.id.clone(),
            backend: record.backend.clone(),
            num_qubits: n,
            shots: record.shots,
            method: mitigator.method().as_str(),
            fit_residual: mitigator.fit_residual(),
            single_qubit_fidelities: fidelities,
            generators,
        };
        match serde_json::to_string_pretty(&report) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    eprintln!("Failed to write report to {path}: {e}");
                } else {
                    println!("\n📄 Fit report saved to: {path}");
                }
            }
            Err(e) => eprintln!("Failed to serialize report: {e}"),
        }
    }
}
