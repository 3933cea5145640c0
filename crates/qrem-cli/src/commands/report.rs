use qrem_core::session::CalibrationRun;
use qrem_tests::TestResult;

pub fn run(run_path: &str, method: &str, output_path: Option<&str>) {
    let record = super::load_run(run_path);
    let method = super::parse_method(method);
    let mitigator = super::fit_from_run(&record, method);

    println!(
        "🔬 Running quality battery on run {} ({} mitigator, {} qubit(s))...\n",
        record.id,
        mitigator.method(),
        mitigator.num_qubits()
    );

    let results = qrem_tests::full_battery(&record, &mitigator);
    let passed = results.iter().filter(|r| r.passed).count();

    println!(
        "{:<30} {:>3} {:>6} {:>10} {:>12}  {}",
        "Test", "P", "Grade", "p-value", "Statistic", "Details"
    );
    println!("{}", "-".repeat(96));
    for result in &results {
        let ok = if result.passed { "✓" } else { "✗" };
        println!(
            "{:<30} {:>3} {:>6} {:>10} {:>12.4}  {}",
            result.name,
            ok,
            result.grade,
            format_p(result),
            result.statistic,
            result.details
        );
    }
    println!("\n{passed}/{} passed", results.len());

    if let Some(path) = output_path {
        let report = generate_report(&record, method_name(&mitigator), &results);
        if let Err(e) = std::fs::write(path, report) {
            eprintln!("Failed to write report to {path}: {e}");
        } else {
            println!("📄 Report saved to: {path}");
        }
    }

    if passed < results.len() {
        std::process::exit(1);
    }
}

fn method_name(mitigator: &qrem_core::mitigator::Mitigator) -> &'static str {
    mitigator.method().as_str()
}

fn format_p(result: &TestResult) -> String {
    result
        .p_value
        .map(|p| format!("{p:.6}"))
        .unwrap_or_else(|| "—".to_string())
}

fn generate_report(record: &CalibrationRun, method: &str, results: &[TestResult]) -> String {
    let passed = results.iter().filter(|r| r.passed).count();
    let mut report = String::new();
    report.push_str("# qrem — Calibration Quality Report\n\n");
    report.push_str(&format!(
        "- Run: {}\n- Backend: {}\n- Qubits: {}\n- Shots/circuit: {}\n- Method: {}\n- Passed: {}/{}\n\n",
        record.id,
        record.backend,
        record.num_qubits,
        record.shots,
        method,
        passed,
        results.len()
    ));
    report.push_str("| Test | P | Grade | p-value | Statistic | Details |\n");
    report.push_str("|------|---|-------|---------|-----------|--------|\n");
    for result in results {
        let ok = if result.passed { "✓" } else { "✗" };
        report.push_str(&format!(
            "| {} | {} | {} | {} | {:.4} | {} |\n",
            result.name,
            ok,
            result.grade,
            format_p(result),
            result.statistic,
            result.details
        ));
    }
    report
}
