use std::fs::File;
use std::io::BufReader;

use qrem_core::counts::{OutcomeCounts, index_bitstring};
use qrem_core::mitigator::raw_expectation;

pub fn run(run_path: &str, counts_path: &str, method: &str, subset: Option<&str>) {
    let record = super::load_run(run_path);
    let method = super::parse_method(method);
    let mitigator = super::fit_from_run(&record, method);

    let measured: OutcomeCounts = match File::open(counts_path)
        .map_err(|e| e.to_string())
        .and_then(|f| serde_json::from_reader(BufReader::new(f)).map_err(|e| e.to_string()))
    {
        Ok(counts) => counts,
        Err(e) => {
            eprintln!("Failed to load counts from {counts_path}: {e}");
            std::process::exit(1);
        }
    };

    let qubits: Vec<usize> = match subset {
        Some(list) => match super::parse_subset(list) {
            Ok(q) => q,
            Err(e) => {
                eprintln!("Bad subset '{list}': {e}");
                std::process::exit(1);
            }
        },
        None => (0..mitigator.num_qubits()).collect(),
    };

    let mitigated = match mitigator.mitigate_counts(&measured, &qubits) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Mitigation failed: {e}");
            std::process::exit(1);
        }
    };
    let mitigated_z = match mitigator.expectation_value(&measured, &qubits) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Expectation query failed: {e}");
            std::process::exit(1);
        }
    };
    let raw_z = raw_expectation(&measured, &qubits);

    println!(
        "Corrected {} shot(s) on qubits {qubits:?} with a {} mitigator\n",
        measured.total_shots(),
        mitigator.method()
    );

    let width = qubits.len();
    println!("{:<10} {:>12} {:>12}", "State", "Raw quasi-p", "Corrected");
    println!("{}", "-".repeat(38));
    for state in 0..mitigated.probabilities.len() {
        println!(
            "{:<10} {:>12.6} {:>12.6}",
            index_bitstring(state, width),
            mitigated.raw[state],
            mitigated.probabilities[state]
        );
    }

    let (best, p) = mitigated.most_likely_state();
    println!("\nMost likely state: {} (p = {p:.4})", index_bitstring(best, width));
    println!("Negative quasi-probability mass: {:.4e}", mitigated.negative_mass);
    println!("⟨Z…Z⟩ raw: {raw_z:.6}   mitigated: {mitigated_z:.6}");
}
