//! CLI for qrem — readout error mitigation from the command line.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "qrem")]
#[command(about = "qrem — fit and query readout error mitigators")]
#[command(version = qrem_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the standard calibration label set for a qubit count
    Labels {
        /// Number of qubits
        qubits: usize,
    },

    /// Execute calibration circuits and record the run to disk
    Calibrate {
        /// Number of qubits
        qubits: usize,

        /// Execution mode: simulate runs the noise simulator, replay
        /// re-validates and re-records a previously saved run
        #[arg(long, default_value = "simulate", value_parser = ["simulate", "replay"])]
        mode: String,

        /// Saved run to replay (required with --mode replay)
        #[arg(long)]
        input: Option<String>,

        /// Shots per calibration circuit
        #[arg(long, default_value = "8192")]
        shots: u64,

        /// P(read 1 | prepared 0) applied to every qubit
        #[arg(long, default_value = "0.02")]
        p01: f64,

        /// P(read 0 | prepared 1) applied to every qubit
        #[arg(long, default_value = "0.04")]
        p10: f64,

        /// Correlated double-flip rate on adjacent qubit pairs
        #[arg(long, default_value = "0.0")]
        correlated: f64,

        /// Simulator RNG seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output path for the run JSON
        #[arg(long, default_value = "calibration.json")]
        output: String,
    },

    /// Fit a mitigator from a recorded run and print subset queries
    Fit {
        /// Path to a recorded run JSON
        run: String,

        /// Fit method: lsq (direct) or ctmp (generator rates)
        #[arg(long, default_value = "ctmp", value_parser = ["lsq", "ctmp"])]
        method: String,

        /// Comma-separated qubit subset to query (default: each single qubit)
        #[arg(long)]
        subset: Option<String>,

        /// Write a machine-readable fit report as JSON
        #[arg(long)]
        output: Option<String>,
    },

    /// Run the calibration quality test battery on a recorded run
    Report {
        /// Path to a recorded run JSON
        run: String,

        /// Fit method: lsq (direct) or ctmp (generator rates)
        #[arg(long, default_value = "ctmp", value_parser = ["lsq", "ctmp"])]
        method: String,

        /// Write the battery results as a markdown report
        #[arg(long)]
        output: Option<String>,
    },

    /// Correct a measured histogram with a fitted mitigator
    Mitigate {
        /// Path to a recorded calibration run JSON
        run: String,

        /// Path to the measured counts JSON to correct
        counts: String,

        /// Fit method: lsq (direct) or ctmp (generator rates)
        #[arg(long, default_value = "ctmp", value_parser = ["lsq", "ctmp"])]
        method: String,

        /// Comma-separated qubit subset (default: all qubits)
        #[arg(long)]
        subset: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Labels { qubits } => commands::labels::run(qubits),
        Commands::Calibrate {
            qubits,
            mode,
            input,
            shots,
            p01,
            p10,
            correlated,
            seed,
            output,
        } => commands::calibrate::run(commands::calibrate::CalibrateConfig {
            qubits,
            mode: &mode,
            input: input.as_deref(),
            shots,
            p01,
            p10,
            correlated,
            seed,
            output: &output,
        }),
        Commands::Fit {
            run,
            method,
            subset,
            output,
        } => commands::fit::run(&run, &method, subset.as_deref(), output.as_deref()),
        Commands::Report {
            run,
            method,
            output,
        } => commands::report::run(&run, &method, output.as_deref()),
        Commands::Mitigate {
            run,
            counts,
            method,
            subset,
        } => commands::mitigate::run(&run, &counts, &method, subset.as_deref()),
    }
}
