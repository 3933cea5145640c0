use qrem_core::calibration::{CalibrationLabel, standard_labels};

pub fn run(qubits: usize) {
    if qubits == 0 {
        eprintln!("Qubit count must be at least 1.");
        std::process::exit(1);
    }

    let labels = standard_labels(qubits);
    println!(
        "Standard calibration set for {qubits} qubit(s): {} circuits\n",
        labels.len()
    );
    println!("{:<6} {:<12} {:>8} {}", "#", "Label", "Weight", "Excited qubits");
    println!("{}", "-".repeat(48));
    for (i, label) in labels.iter().enumerate() {
        let parsed = match CalibrationLabel::new(label, qubits) {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Internal label error: {e}");
                std::process::exit(1);
            }
        };
        let excited: Vec<String> = parsed.excited_qubits().iter().map(|q| q.to_string()).collect();
        println!(
            "{:<6} {:<12} {:>8} {}",
            i,
            label,
            parsed.weight(),
            if excited.is_empty() { "-".to_string() } else { excited.join(",") }
        );
    }
}
