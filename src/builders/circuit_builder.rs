//! Building a time-layered tensor network from a quantum circuit.

use itertools::Itertools;
use log::trace;
use num_complex::Complex64;
use rustc_hash::FxHashMap;

use crate::{
    error::{SimulationError, SimulationResult},
    tensornetwork::{
        contraction::{contract_circuit, freeze_circuit, ContractionConfig},
        operator::Operator,
        state::State,
        tensordata::DataTensor,
    },
    utils::traits::HashMapInsertNew,
};

/// Handle of an operator inside a [`CircuitGraph`].
pub type OperatorIndex = usize;

/// A single time step of a circuit. Every qudit is touched by at most one
/// operator of the layer; untouched qudits are left as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layer {
    operators: Vec<OperatorIndex>,
    qudit_map: FxHashMap<usize, OperatorIndex>,
}

impl Layer {
    fn insert(&mut self, index: OperatorIndex, qudits: &[usize]) {
        for &qudit in qudits {
            self.qudit_map.insert_new(qudit, index);
        }
        self.operators.push(index);
    }

    /// Returns the operators of this layer in the order they were appended.
    #[inline]
    pub fn operators(&self) -> &[OperatorIndex] {
        &self.operators
    }

    /// Returns the operator acting on `qudit` in this layer, if any.
    #[inline]
    pub fn operator_on(&self, qudit: usize) -> Option<OperatorIndex> {
        self.qudit_map.get(&qudit).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.operators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }
}

/// A quantum circuit on `n` qudits of local dimension `d`, stored as an arena of
/// operators and a sequence of layers referring into it.
///
/// Operators are packed greedily: each one lands in the earliest layer after the
/// last layer touching any of its qudits. This keeps the depth minimal without
/// ever reordering operators that share a qudit.
///
/// Contracting the graph only reads it, so the graph can be extended after a
/// contraction; later contractions see the extended circuit.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitGraph {
    qudits: usize,
    dim: usize,
    operators: Vec<Operator>,
    layers: Vec<Layer>,
    /// For every qudit, the index of the first layer it is free in.
    frontier: Vec<usize>,
}

impl CircuitGraph {
    /// Creates an empty circuit on `qudits` qudits of local dimension `dim`.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::builders::circuit_builder::CircuitGraph;
    /// let circuit = CircuitGraph::new(3, 2).unwrap();
    /// assert_eq!(circuit.num_qudits(), 3);
    /// assert_eq!(circuit.depth(), 0);
    /// assert!(CircuitGraph::new(0, 2).is_err());
    /// assert!(CircuitGraph::new(2, 1).is_err());
    /// ```
    pub fn new(qudits: usize, dim: usize) -> SimulationResult<Self> {
        if qudits == 0 {
            return Err(SimulationError::EmptySystem);
        }
        if dim < 2 {
            return Err(SimulationError::DimensionMismatch(format!(
                "local dimension must be at least 2, got {dim}"
            )));
        }
        Ok(Self {
            qudits,
            dim,
            operators: Vec::new(),
            layers: Vec::new(),
            frontier: vec![0; qudits],
        })
    }

    /// Creates an empty circuit on `qubits` qubits.
    pub fn qubits(qubits: usize) -> SimulationResult<Self> {
        Self::new(qubits, 2)
    }

    #[inline]
    pub fn num_qudits(&self) -> usize {
        self.qudits
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the number of layers.
    #[inline]
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    /// Returns the operator with the given handle.
    ///
    /// # Panics
    /// Panics if the handle was not returned by this circuit.
    #[inline]
    pub fn operator(&self, index: OperatorIndex) -> &Operator {
        &self.operators[index]
    }

    /// Returns the operators in the order they were appended.
    #[inline]
    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Appends the operator given by `tensor` acting on `qudits`. The tensor
    /// must have shape `[d; 2k]` with the `k` output axes first.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::{builders::circuit_builder::CircuitGraph, gates::load_gate};
    /// let mut circuit = CircuitGraph::qubits(3).unwrap();
    /// circuit.append_operator(load_gate("h", &[]).unwrap(), &[0]).unwrap();
    /// circuit.append_operator(load_gate("h", &[]).unwrap(), &[2]).unwrap();
    /// circuit.append_operator(load_gate("cx", &[]).unwrap(), &[0, 1]).unwrap();
    /// assert_eq!(circuit.depth(), 2);
    /// assert!(circuit.append_operator(load_gate("h", &[]).unwrap(), &[3]).is_err());
    /// ```
    pub fn append_operator(
        &mut self,
        tensor: DataTensor,
        qudits: &[usize],
    ) -> SimulationResult<OperatorIndex> {
        self.check_qudits(qudits)?;
        self.push_operator(Operator::new(tensor, qudits.to_vec())?)
    }

    /// Appends the matrix `M[out, in]`, given in row-major order, acting on
    /// `qudits`.
    pub fn append_matrix(
        &mut self,
        matrix: Vec<Complex64>,
        qudits: &[usize],
    ) -> SimulationResult<OperatorIndex> {
        self.check_qudits(qudits)?;
        self.push_operator(Operator::from_matrix(self.dim, qudits.to_vec(), matrix)?)
    }

    /// Appends an already constructed operator.
    pub fn push_operator(&mut self, op: Operator) -> SimulationResult<OperatorIndex> {
        if op.dim() != self.dim {
            return Err(SimulationError::DimensionMismatch(format!(
                "operator on qudits {:?} has local dimension {}, but the circuit has {}",
                op.qudits(),
                op.dim(),
                self.dim
            )));
        }
        self.check_qudits(op.qudits())?;

        let layer_index = op
            .qudits()
            .iter()
            .map(|&qudit| self.frontier[qudit])
            .max()
            .unwrap_or_default();
        if layer_index == self.layers.len() {
            self.layers.push(Layer::default());
        }

        let index = self.operators.len();
        self.layers[layer_index].insert(index, op.qudits());
        for &qudit in op.qudits() {
            self.frontier[qudit] = layer_index + 1;
        }
        trace!(operator = index, layer = layer_index, arity = op.arity(); "Placed operator");
        self.operators.push(op);
        Ok(index)
    }

    /// Appends all operators of `other`, shifting its qudits by `offset`.
    pub fn append_circuit(&mut self, other: &Self, offset: usize) -> SimulationResult<()> {
        if other.dim != self.dim {
            return Err(SimulationError::DimensionMismatch(format!(
                "cannot append a circuit of dimension {} to one of dimension {}",
                other.dim, self.dim
            )));
        }
        if offset + other.qudits > self.qudits {
            return Err(SimulationError::IndexOutOfRange {
                qudit: offset + other.qudits - 1,
                qudits: self.qudits,
            });
        }
        for op in &other.operators {
            let qudits = op.qudits().iter().map(|q| q + offset).collect_vec();
            self.push_operator(op.retarget(qudits)?)?;
        }
        Ok(())
    }

    fn check_qudits(&self, qudits: &[usize]) -> SimulationResult<()> {
        match qudits.iter().find(|&&qudit| qudit >= self.qudits) {
            Some(&qudit) => Err(SimulationError::IndexOutOfRange {
                qudit,
                qudits: self.qudits,
            }),
            None => Ok(()),
        }
    }

    /// Contracts the circuit, starting from the all-zero state.
    pub fn contract(&self, config: &ContractionConfig) -> SimulationResult<State> {
        contract_circuit(self, config)
    }

    /// Contracts the circuit exactly into a single operator on all qudits. The
    /// result can be placed into other circuits with [`Self::push_operator`].
    ///
    /// # Examples
    /// ```
    /// # use tnsim::{builders::circuit_builder::CircuitGraph, gates::load_gate};
    /// let mut bell = CircuitGraph::qubits(2).unwrap();
    /// bell.append_operator(load_gate("h", &[]).unwrap(), &[0]).unwrap();
    /// bell.append_operator(load_gate("cx", &[]).unwrap(), &[0, 1]).unwrap();
    /// let gate = bell.to_gate().unwrap();
    /// assert_eq!(gate.arity(), 2);
    ///
    /// let mut circuit = CircuitGraph::qubits(4).unwrap();
    /// circuit.push_operator(gate.retarget(vec![2, 3]).unwrap()).unwrap();
    /// assert_eq!(circuit.num_operators(), 1);
    /// ```
    pub fn to_gate(&self) -> SimulationResult<Operator> {
        freeze_circuit(self)
    }

    /// Contracts the circuit and returns `<psi|op|psi>` for the produced state.
    /// The operator is applied with the same truncation settings, bond cap
    /// included, as the circuit.
    pub fn expected(&self, op: &Operator, config: &ContractionConfig) -> SimulationResult<Complex64> {
        self.contract(config)?.expected_with(op, &config.truncation_policy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f64::consts::FRAC_1_SQRT_2;

    use float_cmp::assert_approx_eq;

    use crate::{gates::load_gate, tensornetwork::contraction::Representation};

    fn gate(name: &str) -> DataTensor {
        load_gate(name, &[]).unwrap()
    }

    #[test]
    fn empty_system() {
        assert_eq!(CircuitGraph::new(0, 3), Err(SimulationError::EmptySystem));
    }

    #[test]
    fn greedy_layering() {
        let mut circuit = CircuitGraph::qubits(4).unwrap();
        let h0 = circuit.append_operator(gate("h"), &[0]).unwrap();
        let h1 = circuit.append_operator(gate("h"), &[1]).unwrap();
        let cx = circuit.append_operator(gate("cx"), &[1, 2]).unwrap();
        let h3 = circuit.append_operator(gate("h"), &[3]).unwrap();
        let x0 = circuit.append_operator(gate("x"), &[0]).unwrap();

        assert_eq!(circuit.depth(), 2);
        assert_eq!(circuit.layers()[0].operators(), &[h0, h1, h3]);
        assert_eq!(circuit.layers()[1].operators(), &[cx, x0]);
        assert_eq!(circuit.layers()[1].operator_on(2), Some(cx));
        assert_eq!(circuit.layers()[1].operator_on(3), None);
    }

    #[test]
    fn later_operator_never_moves_before_dependency() {
        let mut circuit = CircuitGraph::qubits(3).unwrap();
        circuit.append_operator(gate("cx"), &[0, 1]).unwrap();
        circuit.append_operator(gate("cx"), &[1, 2]).unwrap();
        let late = circuit.append_operator(gate("x"), &[2]).unwrap();
        assert_eq!(circuit.depth(), 3);
        assert_eq!(circuit.layers()[2].operator_on(2), Some(late));
    }

    #[test]
    fn rejects_out_of_range() {
        let mut circuit = CircuitGraph::qubits(2).unwrap();
        assert_eq!(
            circuit.append_operator(gate("cx"), &[1, 2]),
            Err(SimulationError::IndexOutOfRange {
                qudit: 2,
                qudits: 2
            })
        );
        assert!(circuit.is_empty());
        assert_eq!(circuit.depth(), 0);
    }

    #[test]
    fn rejects_arity_mismatch() {
        let mut circuit = CircuitGraph::qubits(2).unwrap();
        assert!(matches!(
            circuit.append_operator(gate("cx"), &[0]),
            Err(SimulationError::DimensionMismatch(_))
        ));
        assert!(matches!(
            circuit.append_operator(gate("cx"), &[1, 1]),
            Err(SimulationError::DuplicateQudit(1))
        ));
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let mut circuit = CircuitGraph::new(2, 3).unwrap();
        assert!(matches!(
            circuit.append_operator(gate("h"), &[0]),
            Err(SimulationError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn append_matrix_row_major() {
        let one = Complex64::ONE;
        let zero = Complex64::ZERO;
        let mut circuit = CircuitGraph::qubits(1).unwrap();
        circuit.append_matrix(vec![zero, one, one, zero], &[0]).unwrap();
        let state = circuit.contract(&ContractionConfig::statevector()).unwrap();
        assert_eq!(state.check_state("1").unwrap(), one);
    }

    #[test]
    fn append_circuit_with_offset() {
        let mut bell = CircuitGraph::qubits(2).unwrap();
        bell.append_operator(gate("h"), &[0]).unwrap();
        bell.append_operator(gate("cx"), &[0, 1]).unwrap();

        let mut circuit = CircuitGraph::qubits(3).unwrap();
        circuit.append_circuit(&bell, 1).unwrap();
        assert_eq!(circuit.num_operators(), 2);
        assert_eq!(circuit.operator(1).qudits(), &[1, 2]);
        assert!(matches!(
            circuit.append_circuit(&bell, 2),
            Err(SimulationError::IndexOutOfRange { qudit: 3, .. })
        ));
        assert_eq!(circuit.num_operators(), 2);

        let state = circuit.contract(&ContractionConfig::statevector()).unwrap();
        assert_approx_eq!(f64, state.check_state("011").unwrap().re, FRAC_1_SQRT_2, epsilon = 1e-12);
    }

    #[test]
    fn contraction_reads_current_snapshot() {
        let mut circuit = CircuitGraph::qubits(1).unwrap();
        let config = ContractionConfig::statevector();
        let before = circuit.contract(&config).unwrap();
        circuit.append_operator(gate("x"), &[0]).unwrap();
        let after = circuit.contract(&config).unwrap();
        assert_eq!(before.check_state("0").unwrap(), Complex64::ONE);
        assert_eq!(after.check_state("1").unwrap(), Complex64::ONE);
    }

    #[test]
    fn expected_through_circuit() {
        let mut circuit = CircuitGraph::qubits(2).unwrap();
        circuit.append_operator(gate("x"), &[1]).unwrap();
        let z1 = Operator::new(gate("z"), vec![1]).unwrap();
        for config in [ContractionConfig::statevector(), ContractionConfig::mps(0.0).unwrap()] {
            let value = circuit.expected(&z1, &config).unwrap();
            assert_approx_eq!(f64, value.re, -1.0, epsilon = 1e-12);
            assert_eq!(
                circuit.contract(&config).unwrap().representation(),
                config.representation()
            );
        }
        assert_eq!(ContractionConfig::mps(0.0).unwrap().representation(), Representation::Mps);
    }

    #[test]
    fn expected_keeps_bond_cap() {
        let mut circuit = CircuitGraph::qubits(2).unwrap();
        circuit.append_operator(gate("h"), &[0]).unwrap();
        circuit.append_operator(gate("h"), &[1]).unwrap();
        // CZ entangles |++>, so applying it needs a bond of 2
        let cz = Operator::new(gate("cz"), vec![0, 1]).unwrap();

        let uncapped = ContractionConfig::mps(0.0).unwrap();
        assert_approx_eq!(f64, circuit.expected(&cz, &uncapped).unwrap().re, 0.5, epsilon = 1e-12);

        let capped = uncapped.with_max_bond_dim(1);
        assert_eq!(circuit.contract(&capped).unwrap().bond_dims(), Some(vec![1]));
        match circuit.expected(&cz, &capped) {
            Err(SimulationError::TruncationCapExceeded {
                location,
                required,
                cap,
                ..
            }) => {
                assert!(location.contains("expectation operator"), "{location}");
                assert_eq!((required, cap), (2, 1));
            }
            other => panic!("expected a truncation cap error, got {other:?}"),
        }
    }

    #[test]
    fn to_gate_of_hadamard_circuit() {
        let mut circuit = CircuitGraph::qubits(1).unwrap();
        circuit.append_operator(gate("h"), &[0]).unwrap();
        let frozen = circuit.to_gate().unwrap();
        assert_approx_eq!(&DataTensor, frozen.tensor(), &gate("h"), epsilon = 1e-12);
    }
}
