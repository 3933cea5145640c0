//! Calibration quality test battery.
//!
//! Statistical and structural checks for recorded calibration runs and the
//! mitigators fitted from them. Each check returns a [`TestResult`] with a
//! p-value where one applies, a pass/fail determination, and a letter grade
//! (A through F).

use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use qrem_core::counts::{bitstring_index, index_bitstring, restrict_bitstring};
use qrem_core::matrix::Matrix;
use qrem_core::mitigator::Mitigator;
use qrem_core::session::CalibrationRun;

/// Full-matrix checks are skipped above this qubit count.
const MAX_FULL_QUERY_QUBITS: usize = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of a single quality check.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
    pub grade: char,
}

impl TestResult {
    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise or None
    pub fn grade_from_p(p: Option<f64>) -> char {
        match p {
            Some(p) if p >= 0.1 => 'A',
            Some(p) if p >= 0.01 => 'B',
            Some(p) if p >= 0.001 => 'C',
            Some(p) if p >= 0.0001 => 'D',
            _ => 'F',
        }
    }

    /// Determine pass/fail from p-value against a threshold (default 0.01).
    pub fn pass_from_p(p: Option<f64>, threshold: f64) -> bool {
        match p {
            Some(p) => p >= threshold,
            None => false,
        }
    }

    fn structural(name: &str, passed: bool, statistic: f64, details: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            p_value: None,
            statistic,
            details,
            grade: if passed { 'A' } else { 'F' },
        }
    }

    fn skipped(name: &str, reason: String) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            p_value: None,
            statistic: 0.0,
            details: format!("skipped: {reason}"),
            grade: 'A',
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Structural checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Every circuit's counts must sum to the declared shot count.
pub fn shot_conservation(run: &CalibrationRun) -> TestResult {
    let name = "Shot Conservation";
    let mut max_deviation = 0u64;
    for counts in &run.counts {
        let total = counts.total_shots();
        max_deviation = max_deviation.max(total.abs_diff(run.shots));
    }
    TestResult::structural(
        name,
        max_deviation == 0,
        max_deviation as f64,
        format!("{} circuits, {} shots declared", run.counts.len(), run.shots),
    )
}

/// Every queried single- and pair-subset assignment matrix must be
/// column-stochastic with entries in [0, 1].
pub fn column_stochasticity(mitigator: &Mitigator) -> TestResult {
    let name = "Column Stochasticity";
    let n = mitigator.num_qubits();
    let mut max_column_error = 0.0f64;
    let mut entries_in_range = true;

    let mut check = |matrix: &Matrix| {
        for sum in matrix.column_sums() {
            max_column_error = max_column_error.max((sum - 1.0).abs());
        }
        if !matrix.is_stochastic(1e-8) {
            entries_in_range = false;
        }
    };

    for q in 0..n {
        if let Ok(a) = mitigator.assignment_matrix(&[q]) {
            check(&a);
        }
    }
    for j in 0..n {
        for k in (j + 1)..n {
            if let Ok(a) = mitigator.assignment_matrix(&[j, k]) {
                check(&a);
            }
        }
    }

    TestResult::structural(
        name,
        entries_in_range && max_column_error < 1e-8,
        max_column_error,
        format!("max |column sum - 1| = {max_column_error:.3e}"),
    )
}

/// Diagonal entries should dominate each column (readout mostly tells the
/// truth).
pub fn diagonal_dominance(mitigator: &Mitigator) -> TestResult {
    let name = "Diagonal Dominance";
    let n = mitigator.num_qubits();
    let mut min_diagonal = 1.0f64;
    for q in 0..n {
        if let Ok(a) = mitigator.assignment_matrix(&[q]) {
            for i in 0..a.dim() {
                min_diagonal = min_diagonal.min(a.get(i, i));
            }
        }
    }
    TestResult::structural(
        name,
        min_diagonal > 0.5,
        min_diagonal,
        format!("min single-qubit diagonal = {min_diagonal:.4}"),
    )
}

/// Assignment fidelity must stay inside [0, 1] on every single qubit.
pub fn fidelity_bounds(mitigator: &Mitigator) -> TestResult {
    let name = "Fidelity Bounds";
    let n = mitigator.num_qubits();
    let mut mean = 0.0;
    let mut in_bounds = true;
    for q in 0..n {
        match mitigator.assignment_fidelity(&[q]) {
            Ok(f) => {
                if !(0.0..=1.0 + 1e-12).contains(&f) {
                    in_bounds = false;
                }
                mean += f;
            }
            Err(_) => in_bounds = false,
        }
    }
    mean /= n as f64;
    TestResult::structural(
        name,
        in_bounds,
        mean,
        format!("mean single-qubit fidelity = {mean:.4}"),
    )
}

/// The all-qubit assignment matrix, marginalized onto each single qubit
/// with prepared-state weights taken from the calibration labels, must
/// agree with the direct single-qubit query.
pub fn marginalization_consistency(run: &CalibrationRun, mitigator: &Mitigator) -> TestResult {
    let name = "Marginalization Consistency";
    let n = mitigator.num_qubits();
    if n > MAX_FULL_QUERY_QUBITS {
        return TestResult::skipped(name, format!("{n} qubits exceeds full-query limit"));
    }
    let all: Vec<usize> = (0..n).collect();
    let full = match mitigator.assignment_matrix(&all) {
        Ok(m) => m,
        Err(e) => return TestResult::structural(name, false, 0.0, e.to_string()),
    };

    // CTMP subset queries drop boundary-straddling generators, so allow a
    // model-level tolerance rather than numerical noise only.
    let tol = 0.02;
    let mut max_deviation = 0.0f64;
    for q in 0..n {
        let direct = match mitigator.assignment_matrix(&[q]) {
            Ok(m) => m,
            Err(e) => return TestResult::structural(name, false, 0.0, e.to_string()),
        };
        let mut marginal = Matrix::zeros(2);
        let mut weight = [0.0f64; 2];
        for label in &run.labels {
            let prepared = bitstring_index(label);
            let p_sub = bitstring_index(&restrict_bitstring(label, &[q]));
            for measured in 0..full.dim() {
                let m_sub =
                    bitstring_index(&restrict_bitstring(&index_bitstring(measured, n), &[q]));
                marginal.add(m_sub, p_sub, full.get(measured, prepared));
            }
            weight[p_sub] += 1.0;
        }
        for col in 0..2 {
            if weight[col] == 0.0 {
                continue;
            }
            for row in 0..2 {
                let value = marginal.get(row, col) / weight[col];
                max_deviation = max_deviation.max((value - direct.get(row, col)).abs());
            }
        }
    }

    TestResult::structural(
        name,
        max_deviation < tol,
        max_deviation,
        format!("max |marginalized - direct| = {max_deviation:.3e}"),
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// Statistical checks
// ═══════════════════════════════════════════════════════════════════════════════

/// Chi-squared goodness of fit: observed counts per calibration circuit vs
/// the distribution the fitted model predicts for that prepared state.
///
/// Low-expectation outcomes are pooled into a tail bin. The reported
/// p-value is the worst circuit's, Bonferroni-adjusted.
pub fn goodness_of_fit(run: &CalibrationRun, mitigator: &Mitigator) -> TestResult {
    let name = "Model Goodness of Fit";
    let n = mitigator.num_qubits();
    if n > MAX_FULL_QUERY_QUBITS {
        return TestResult::skipped(name, format!("{n} qubits exceeds full-query limit"));
    }
    let metadata = match run.metadata() {
        Ok(m) => m,
        Err(e) => return TestResult::structural(name, false, 0.0, e.to_string()),
    };
    let all: Vec<usize> = (0..n).collect();
    let full = match mitigator.assignment_matrix(&all) {
        Ok(m) => m,
        Err(e) => return TestResult::structural(name, false, 0.0, e.to_string()),
    };

    let mut worst_p = 1.0f64;
    let mut worst_chi2 = 0.0f64;
    for (circuit, counts) in run.counts.iter().enumerate() {
        let prepared = bitstring_index(metadata.label(circuit).as_str());
        let shots = counts.total_shots() as f64;

        let mut chi2 = 0.0f64;
        let mut bins = 0usize;
        let mut tail_expected = 0.0f64;
        let mut tail_observed = 0.0f64;
        for measured in 0..full.dim() {
            let expected = full.get(measured, prepared) * shots;
            let observed = counts.count(&index_bitstring(measured, n)) as f64;
            if expected >= 5.0 {
                chi2 += (observed - expected).powi(2) / expected;
                bins += 1;
            } else {
                tail_expected += expected;
                tail_observed += observed;
            }
        }
        if tail_expected >= 5.0 {
            chi2 += (tail_observed - tail_expected).powi(2) / tail_expected;
            bins += 1;
        }
        if bins < 2 {
            continue;
        }
        let dist = match ChiSquared::new((bins - 1) as f64) {
            Ok(d) => d,
            Err(_) => continue,
        };
        let p = dist.sf(chi2);
        if p < worst_p {
            worst_p = p;
            worst_chi2 = chi2;
        }
    }

    let adjusted = (worst_p * run.counts.len() as f64).min(1.0);
    TestResult {
        name: name.to_string(),
        passed: TestResult::pass_from_p(Some(adjusted), 0.01),
        p_value: Some(adjusted),
        statistic: worst_chi2,
        details: format!("worst circuit chi2 = {worst_chi2:.2}"),
        grade: TestResult::grade_from_p(Some(adjusted)),
    }
}

/// Per-qubit flip rates should be consistent across the circuits that
/// prepare the same bit value: each circuit's flip fraction is z-tested
/// against the pooled fraction.
pub fn flip_rate_consistency(run: &CalibrationRun) -> TestResult {
    let name = "Flip Rate Consistency";
    let metadata = match run.metadata() {
        Ok(m) => m,
        Err(e) => return TestResult::structural(name, false, 0.0, e.to_string()),
    };
    let n = metadata.num_qubits();
    let normal = Normal::new(0.0, 1.0).expect("unit normal");

    let mut max_abs_z = 0.0f64;
    let mut comparisons = 0usize;
    for q in 0..n {
        for prepared_bit in [false, true] {
            // Pool flips over every circuit preparing this bit on qubit q.
            let mut pooled_flips = 0.0f64;
            let mut pooled_shots = 0.0f64;
            let mut per_circuit: Vec<(f64, f64)> = Vec::new();
            for (circuit, counts) in run.counts.iter().enumerate() {
                if metadata.label(circuit).bit(q) != prepared_bit {
                    continue;
                }
                let marginal = counts.marginalize(&[q]);
                let flipped = if prepared_bit { "0" } else { "1" };
                let flips = marginal.count(flipped) as f64;
                let shots = marginal.total_shots() as f64;
                pooled_flips += flips;
                pooled_shots += shots;
                per_circuit.push((flips, shots));
            }
            if pooled_shots == 0.0 || per_circuit.len() < 2 {
                continue;
            }
            let p_hat = pooled_flips / pooled_shots;
            if p_hat <= 0.0 || p_hat >= 1.0 {
                continue;
            }
            for (flips, shots) in per_circuit {
                let z = (flips - shots * p_hat) / (shots * p_hat * (1.0 - p_hat)).sqrt();
                max_abs_z = max_abs_z.max(z.abs());
                comparisons += 1;
            }
        }
    }

    if comparisons == 0 {
        return TestResult::skipped(name, "no repeated preparations to compare".to_string());
    }
    let p_single = 2.0 * normal.sf(max_abs_z);
    let adjusted = (p_single * comparisons as f64).min(1.0);
    TestResult {
        name: name.to_string(),
        passed: TestResult::pass_from_p(Some(adjusted), 0.01),
        p_value: Some(adjusted),
        statistic: max_abs_z,
        details: format!("max |z| = {max_abs_z:.2} over {comparisons} comparisons"),
        grade: TestResult::grade_from_p(Some(adjusted)),
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Battery
// ═══════════════════════════════════════════════════════════════════════════════

/// Run every check against a recorded run and its fitted mitigator.
pub fn full_battery(run: &CalibrationRun, mitigator: &Mitigator) -> Vec<TestResult> {
    vec![
        shot_conservation(run),
        column_stochasticity(mitigator),
        diagonal_dominance(mitigator),
        fidelity_bounds(mitigator),
        marginalization_consistency(run, mitigator),
        goodness_of_fit(run, mitigator),
        flip_rate_consistency(run),
    ]
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use qrem_core::backend::ReadoutBackend;
    use qrem_core::calibration::{generate_calibration, standard_labels};
    use qrem_core::fitter::{FitMethod, fit};
    use qrem_core::sim::{NoisySimulator, ReadoutNoise};

    fn simulated_run(n: usize, noise: ReadoutNoise, seed: u64) -> CalibrationRun {
        let labels = standard_labels(n);
        let refs: Vec<&str> = labels.iter().map(|s| s.as_str()).collect();
        let (circuits, metadata) = generate_calibration(n, &refs).unwrap();
        let backend = NoisySimulator::new(noise, seed);
        let counts = backend.execute(&circuits, 8192).unwrap();
        CalibrationRun::new(backend.name(), &metadata, 8192, counts)
    }

    #[test]
    fn near_ideal_run_passes_battery() {
        let run = simulated_run(4, ReadoutNoise::uniform(4, 0.01, 0.02), 5);
        let metadata = run.metadata().unwrap();
        for method in [FitMethod::LeastSquares, FitMethod::Ctmp] {
            let mitigator = fit(&run.counts, &metadata, method).unwrap();
            for result in full_battery(&run, &mitigator) {
                assert!(result.passed, "{method}: {} failed: {}", result.name, result.details);
            }
        }
    }

    #[test]
    fn shot_conservation_catches_missing_shots() {
        let mut run = simulated_run(2, ReadoutNoise::ideal(2), 9);
        run.shots += 1;
        let result = shot_conservation(&run);
        assert!(!result.passed);
        assert_eq!(result.grade, 'F');
    }

    #[test]
    fn corrupted_counts_fail_goodness_of_fit() {
        let run = simulated_run(3, ReadoutNoise::uniform(3, 0.01, 0.01), 21);
        let metadata = run.metadata().unwrap();
        let mitigator = fit(&run.counts, &metadata, FitMethod::Ctmp).unwrap();

        // Swap one circuit's counts for a grossly wrong histogram.
        let mut corrupted = run.clone();
        let mut bad = qrem_core::OutcomeCounts::new(3);
        bad.record("111", 4096);
        bad.record("000", 4096);
        corrupted.counts[0] = bad;

        let result = goodness_of_fit(&corrupted, &mitigator);
        assert!(!result.passed, "{}", result.details);
        assert_eq!(result.grade, 'F');
    }

    #[test]
    fn grades_follow_p_values() {
        assert_eq!(TestResult::grade_from_p(Some(0.5)), 'A');
        assert_eq!(TestResult::grade_from_p(Some(0.05)), 'B');
        assert_eq!(TestResult::grade_from_p(Some(0.005)), 'C');
        assert_eq!(TestResult::grade_from_p(Some(0.0005)), 'D');
        assert_eq!(TestResult::grade_from_p(None), 'F');
    }

    #[test]
    fn battery_reports_every_check() {
        let run = simulated_run(2, ReadoutNoise::ideal(2), 3);
        let metadata = run.metadata().unwrap();
        let mitigator = fit(&run.counts, &metadata, FitMethod::LeastSquares).unwrap();
        let results = full_battery(&run, &mitigator);
        assert_eq!(results.len(), 7);
    }
}
