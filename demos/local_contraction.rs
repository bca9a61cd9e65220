use flexi_logger::{opt_format, Logger};
use log::{info, LevelFilter};
use tnsim::{
    builders::circuit_builder::CircuitGraph,
    gates::{controlled_shift, fourier, load_gate},
    tensornetwork::{contraction::ContractionConfig, operator::Operator},
};

// Prepares GHZ states on qubits and qutrits and contracts them both ways.
fn main() {
    let _logger = Logger::with(LevelFilter::Info)
        .format(opt_format)
        .start()
        .unwrap();

    let qubits = 5;
    let mut ghz = CircuitGraph::qubits(qubits).unwrap();
    ghz.append_operator(load_gate("h", &[]).unwrap(), &[0]).unwrap();
    for q in 1..qubits {
        ghz.append_operator(load_gate("cx", &[]).unwrap(), &[q - 1, q])
            .unwrap();
    }

    for config in [
        ContractionConfig::statevector(),
        ContractionConfig::mps(0.0).unwrap(),
    ] {
        let state = ghz.contract(&config).unwrap();
        info!(
            representation:% = config.representation(),
            zeros:% = state.check_state("00000").unwrap(),
            ones:% = state.check_state("11111").unwrap(),
            bond_dims:? = state.bond_dims();
            "Qubit GHZ state"
        );
    }

    let qutrits = 3;
    let mut ghz3 = CircuitGraph::new(qutrits, 3).unwrap();
    ghz3.push_operator(Operator::new(fourier(3), vec![0]).unwrap())
        .unwrap();
    for q in 1..qutrits {
        ghz3.push_operator(Operator::new(controlled_shift(3), vec![q - 1, q]).unwrap())
            .unwrap();
    }
    let state = ghz3.contract(&ContractionConfig::mps(1e-12).unwrap()).unwrap();
    for label in ["000", "111", "222", "012"] {
        info!(label, amplitude:% = state.check_state(label).unwrap(); "Qutrit GHZ amplitude");
    }

    let frozen = ghz.to_gate().unwrap();
    info!(arity = frozen.arity(); "Frozen the qubit GHZ circuit into one operator");
}
