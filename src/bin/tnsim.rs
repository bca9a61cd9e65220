use std::{error::Error, fs, path::PathBuf};

use clap::Parser;
use flexi_logger::{opt_format, Duplicate, FileSpec, Logger, LoggerHandle};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use tnsim::{
    builders::{
        connectivity::ConnectivityLayout,
        random_circuit::{random_circuit, random_observables},
    },
    tensornetwork::contraction::ContractionConfig,
};

/// Largest system for which the exact statevector is computed for comparison.
const MAX_EXACT_QUBITS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Layout {
    Line,
    Ring,
    All,
}

impl Layout {
    fn with_size(self, qubits: usize) -> ConnectivityLayout {
        match self {
            Self::Line => ConnectivityLayout::Line(qubits),
            Self::Ring => ConnectivityLayout::Ring(qubits),
            Self::All => ConnectivityLayout::All(qubits),
        }
    }
}

/// Contracts a random circuit and reports the properties of the produced state.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, default_value_t = 10)]
    qubits: usize,
    #[arg(short, long, default_value_t = 8)]
    depth: usize,
    #[arg(short, long, default_value_t = 23)]
    seed: u64,
    #[arg(long, default_value_t = 0.4)]
    single_qubit_probability: f64,
    #[arg(long, default_value_t = 0.4)]
    two_qubit_probability: f64,
    /// Probability of measuring a random Pauli observable on each qubit.
    #[arg(long, default_value_t = 0.3)]
    observable_probability: f64,
    #[arg(long, value_enum, default_value_t = Layout::Line)]
    layout: Layout,
    /// `statevector` or `mps`.
    #[arg(short, long, default_value = "mps")]
    representation: String,
    #[arg(short, long, default_value_t = 1e-10)]
    eps: f64,
    #[arg(long)]
    max_bond_dim: Option<usize>,
    /// JSON file with a contraction configuration, overriding the options above.
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Directory to write a log file to, in addition to stdout.
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn setup_logging(spec: &str, log_dir: Option<&PathBuf>) -> Result<LoggerHandle, Box<dyn Error>> {
    let logger = Logger::try_with_str(spec)?.format(opt_format);
    let logger = match log_dir {
        Some(directory) => logger
            .log_to_file(
                FileSpec::default()
                    .directory(directory)
                    .suppress_timestamp(),
            )
            .duplicate_to_stdout(Duplicate::All),
        None => logger,
    };
    Ok(logger.start()?)
}

fn load_config(args: &Cli) -> Result<ContractionConfig, Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => {
            let config: ContractionConfig = serde_json::from_str(&fs::read_to_string(path)?)?;
            config.validate()?;
            config
        }
        None => {
            let config = ContractionConfig::parse("time", &args.representation, args.eps)?;
            match args.max_bond_dim {
                Some(cap) => config.with_max_bond_dim(cap),
                None => config,
            }
        }
    };
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();
    let _logger = setup_logging(&args.log_level, args.log_dir.as_ref())?;
    let config = load_config(&args)?;
    info!(
        seed = args.seed,
        qubits = args.qubits,
        depth = args.depth,
        layout:? = args.layout;
        "Running random circuit"
    );

    let mut rng = StdRng::seed_from_u64(args.seed);
    let circuit = random_circuit(
        args.qubits,
        args.depth,
        args.single_qubit_probability,
        args.two_qubit_probability,
        &mut rng,
        args.layout.with_size(args.qubits),
    )?;
    info!(operators = circuit.num_operators(), layers = circuit.depth(); "Built circuit");

    let state = circuit.contract(&config)?;
    if let Some(bond_dims) = state.bond_dims() {
        info!(bond_dims:? = bond_dims; "Bond dimensions");
    }
    info!(
        truncation_error = state.truncation_error(),
        norm_squared = state.norm_squared();
        "Contracted state"
    );

    let policy = config.truncation_policy();
    for observable in random_observables(args.qubits, args.observable_probability, &mut rng)? {
        let value = state.expected_with(&observable, &policy)?;
        info!(qubits:? = observable.qudits(), re = value.re, im = value.im; "Expectation value");
    }

    if args.qubits <= MAX_EXACT_QUBITS {
        let exact = circuit.contract(&ContractionConfig::statevector())?;
        let fidelity = exact.overlap(&state)?.norm_sqr() / state.norm_squared();
        info!(fidelity; "Fidelity against exact statevector");
    }
    Ok(())
}
