pub mod calibrate;
pub mod fit;
pub mod labels;
pub mod mitigate;
pub mod report;

use std::path::Path;

use qrem_core::fitter::FitMethod;
use qrem_core::matrix::Matrix;
use qrem_core::mitigator::Mitigator;
use qrem_core::session::CalibrationRun;

/// Parse a fit method string into the enum.
pub fn parse_method(s: &str) -> FitMethod {
    match s {
        "lsq" | "least_squares" => FitMethod::LeastSquares,
        "ctmp" => FitMethod::Ctmp,
        _ => {
            eprintln!("Unknown fit method '{s}', expected lsq or ctmp.");
            std::process::exit(1);
        }
    }
}

/// Parse a comma-separated qubit list ("0,2,3").
pub fn parse_subset(s: &str) -> Result<Vec<usize>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid qubit index '{}'", part.trim()))
        })
        .collect()
}

/// Load a recorded run, exiting on failure.
pub fn load_run(path: &str) -> CalibrationRun {
    match CalibrationRun::load(Path::new(path)) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Failed to load run from {path}: {e}");
            std::process::exit(1);
        }
    }
}

/// Fit a mitigator from a run, exiting on failure.
pub fn fit_from_run(run: &CalibrationRun, method: FitMethod) -> Mitigator {
    let metadata = match run.metadata() {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Invalid calibration labels in run: {e}");
            std::process::exit(1);
        }
    };
    match qrem_core::fitter::fit(&run.counts, &metadata, method) {
        Ok(mitigator) => mitigator,
        Err(e) => {
            eprintln!("Fit failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Print a matrix with basis-state row/column headers.
pub fn print_matrix(matrix: &Matrix, width: usize) {
    let dim = matrix.dim();
    print!("{:>width$} ", "", width = width + 2);
    for col in 0..dim {
        print!("{:>9} ", qrem_core::counts::index_bitstring(col, width));
    }
    println!();
    for row in 0..dim {
        print!("  {:>width$} ", qrem_core::counts::index_bitstring(row, width));
        for col in 0..dim {
            print!("{:>9.5} ", matrix.get(row, col));
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // parse_method tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_lsq_variants() {
        assert_eq!(parse_method("lsq"), FitMethod::LeastSquares);
        assert_eq!(parse_method("least_squares"), FitMethod::LeastSquares);
    }

    #[test]
    fn test_parse_ctmp() {
        assert_eq!(parse_method("ctmp"), FitMethod::Ctmp);
    }

    // -----------------------------------------------------------------------
    // parse_subset tests
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_subset_single() {
        assert_eq!(parse_subset("3").unwrap(), vec![3]);
    }

    #[test]
    fn test_parse_subset_list_with_spaces() {
        assert_eq!(parse_subset("0, 2,3").unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn test_parse_subset_rejects_garbage() {
        assert!(parse_subset("0,x").is_err());
        assert!(parse_subset("").is_err());
    }
}
