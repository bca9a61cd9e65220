use itertools::Itertools;
use rand::distributions::Bernoulli;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::builders::circuit_builder::CircuitGraph;
use crate::builders::connectivity::{Connectivity, ConnectivityLayout};
use crate::error::{SimulationError, SimulationResult};
use crate::gates::load_gate;
use crate::tensornetwork::operator::Operator;

fn die(probability: f64) -> SimulationResult<Bernoulli> {
    Bernoulli::new(probability).map_err(|_| SimulationError::InvalidProbability(probability))
}

/// Creates a random qubit circuit: a layer of Hadamards followed by `rounds`
/// many rounds of single and two qubit gate layers. Places the gates with the
/// given probabilities and only on qubit pairs specified by the `connectivity`.
///
/// # Examples
/// ```
/// # use rand::{rngs::StdRng, SeedableRng};
/// # use tnsim::builders::{connectivity::ConnectivityLayout, random_circuit::random_circuit};
/// let mut rng = StdRng::seed_from_u64(42);
/// let circuit = random_circuit(4, 3, 0.5, 0.5, &mut rng, ConnectivityLayout::Line(4)).unwrap();
/// assert_eq!(circuit.num_qudits(), 4);
/// ```
pub fn random_circuit<R>(
    qubits: usize,
    rounds: usize,
    single_qubit_probability: f64,
    two_qubit_probability: f64,
    rng: &mut R,
    connectivity: ConnectivityLayout,
) -> SimulationResult<CircuitGraph>
where
    R: Rng + ?Sized,
{
    let single_qubit_gates = [
        load_gate("sx", &[])?,
        load_gate("sy", &[])?,
        load_gate("sz", &[])?,
    ];
    let hadamard = load_gate("h", &[])?;
    let fsim = load_gate("fsim", &[0.3, 0.2])?;

    let single_qubit_die = die(single_qubit_probability)?;
    let two_qubit_die = die(two_qubit_probability)?;

    // Get connectivity for given size
    let connectivity_graph = Connectivity::new(connectivity);
    let filtered_connectivity = connectivity_graph
        .connectivity
        .iter()
        .filter(|&&(u, v)| u < qubits && v < qubits)
        .collect_vec();

    let mut circuit = CircuitGraph::qubits(qubits)?;
    for i in 0..qubits {
        circuit.append_operator(hadamard.clone(), &[i])?;
    }

    for _ in 0..rounds {
        for i in 0..qubits {
            if rng.sample(single_qubit_die) {
                if let Some(gate) = single_qubit_gates.choose(rng) {
                    circuit.append_operator(gate.clone(), &[i])?;
                }
            }
        }
        for &&(i, j) in &filtered_connectivity {
            if rng.sample(two_qubit_die) {
                circuit.append_operator(fsim.clone(), &[i, j])?;
            }
        }
    }

    Ok(circuit)
}

/// Places a random Pauli observable on every qubit with the given probability.
pub fn random_observables<R>(
    qubits: usize,
    observable_probability: f64,
    rng: &mut R,
) -> SimulationResult<Vec<Operator>>
where
    R: Rng + ?Sized,
{
    let observables = [
        load_gate("x", &[])?,
        load_gate("y", &[])?,
        load_gate("z", &[])?,
    ];
    let observable_die = die(observable_probability)?;

    let mut out = Vec::new();
    for i in 0..qubits {
        if rng.sample(observable_die) {
            if let Some(observable) = observables.choose(rng) {
                out.push(Operator::new(observable.clone(), vec![i])?);
            }
        }
    }
    Ok(out)
}
