//! Contracting circuit graphs into states.
//!
//! Layers are always processed in time order, as each layer consumes the output
//! of the previous one. Every contraction starts from the all-zero state and
//! reads the graph as it is at the time of the call; the produced state owns all
//! of its data.
use std::{fmt, str::FromStr};

use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::{
    builders::circuit_builder::CircuitGraph,
    error::{SimulationError, SimulationResult},
    tensornetwork::{
        mps::{MpsState, TruncationPolicy},
        operator::Operator,
        state::State,
        statevector::Statevector,
        tensordata::DataTensor,
    },
};

/// The order in which the tensor network is contracted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractionScheme {
    /// Layer by layer, following the time order of the circuit.
    #[default]
    Time,
}

impl FromStr for ContractionScheme {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "time" => Ok(Self::Time),
            _ => Err(SimulationError::UnsupportedScheme(s.to_string())),
        }
    }
}

impl fmt::Display for ContractionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Time => write!(f, "time"),
        }
    }
}

/// How the produced state is stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Exact dense statevector.
    #[default]
    Statevector,
    /// Matrix product state, truncated according to the tolerance.
    Mps,
}

impl FromStr for Representation {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "statevector" | "sv" => Ok(Self::Statevector),
            "mps" => Ok(Self::Mps),
            _ => Err(SimulationError::UnsupportedRepresentation(s.to_string())),
        }
    }
}

impl fmt::Display for Representation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Statevector => write!(f, "statevector"),
            Self::Mps => write!(f, "mps"),
        }
    }
}

/// Settings for a contraction.
///
/// `eps` is the largest fraction of the squared singular values discarded at
/// any single cut of an MPS split; it has no effect on statevectors.
/// `max_bond_dim` optionally caps MPS bonds: a contraction that would need a
/// larger bond to meet `eps` fails instead of being clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractionConfig {
    #[serde(default)]
    scheme: ContractionScheme,
    #[serde(default)]
    representation: Representation,
    #[serde(default)]
    eps: f64,
    #[serde(default)]
    max_bond_dim: Option<usize>,
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self {
            scheme: ContractionScheme::Time,
            representation: Representation::Statevector,
            eps: 0.0,
            max_bond_dim: None,
        }
    }
}

impl ContractionConfig {
    /// Creates a validated configuration.
    pub fn new(
        scheme: ContractionScheme,
        representation: Representation,
        eps: f64,
    ) -> SimulationResult<Self> {
        let config = Self {
            scheme,
            representation,
            eps,
            max_bond_dim: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Creates a configuration from the names of the scheme and representation.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::{error::SimulationError, tensornetwork::contraction::ContractionConfig};
    /// let config = ContractionConfig::parse("time", "mps", 1e-8).unwrap();
    /// assert_eq!(config.eps(), 1e-8);
    /// assert!(matches!(
    ///     ContractionConfig::parse("space", "mps", 0.0),
    ///     Err(SimulationError::UnsupportedScheme(_))
    /// ));
    /// ```
    pub fn parse(scheme: &str, representation: &str, eps: f64) -> SimulationResult<Self> {
        Self::new(scheme.parse()?, representation.parse()?, eps)
    }

    /// Exact statevector contraction.
    #[must_use]
    pub fn statevector() -> Self {
        Self::default()
    }

    /// MPS contraction with the given tolerance.
    pub fn mps(eps: f64) -> SimulationResult<Self> {
        Self::new(ContractionScheme::Time, Representation::Mps, eps)
    }

    /// Sets the maximum bond dimension.
    #[must_use]
    pub fn with_max_bond_dim(mut self, max_bond_dim: usize) -> Self {
        self.max_bond_dim = Some(max_bond_dim);
        self
    }

    /// Checks the tolerance and bond cap. Deserialized configurations are only
    /// checked here, so every contraction calls it first.
    pub fn validate(&self) -> SimulationResult<()> {
        self.truncation_policy().validate()
    }

    #[inline]
    pub fn scheme(&self) -> ContractionScheme {
        self.scheme
    }

    #[inline]
    pub fn representation(&self) -> Representation {
        self.representation
    }

    #[inline]
    pub fn eps(&self) -> f64 {
        self.eps
    }

    #[inline]
    pub fn max_bond_dim(&self) -> Option<usize> {
        self.max_bond_dim
    }

    /// Returns the truncation settings used for MPS splits.
    #[must_use]
    pub fn truncation_policy(&self) -> TruncationPolicy {
        TruncationPolicy {
            eps: self.eps,
            max_bond_dim: self.max_bond_dim,
        }
    }
}

/// Contracts the circuit into a state according to `config`.
pub fn contract_circuit(
    circuit: &CircuitGraph,
    config: &ContractionConfig,
) -> SimulationResult<State> {
    config.validate()?;
    info!(
        qudits = circuit.num_qudits(),
        layers = circuit.depth(),
        operators = circuit.num_operators(),
        representation:% = config.representation(),
        eps = config.eps();
        "Start contracting circuit"
    );

    let state = match config.representation() {
        Representation::Statevector => State::Statevector(contract_statevector(circuit)),
        Representation::Mps => {
            State::Mps(contract_mps(circuit, &config.truncation_policy())?)
        }
    };

    info!(truncation_error = state.truncation_error(); "Completed circuit contraction");
    Ok(state)
}

/// Applies every operator of the circuit, layer by layer, to a dense tensor
/// whose leading `n` axes are the qudits.
fn evolve_dense(circuit: &CircuitGraph, mut tensor: DataTensor) -> DataTensor {
    for (layer_index, layer) in circuit.layers().iter().enumerate() {
        debug!(layer = layer_index, operators = layer.len(); "Contracting layer");
        for &index in layer.operators() {
            let op = circuit.operator(index);
            trace!(operator = index, arity = op.arity(); "Applying operator");
            tensor = op.apply(&tensor, op.qudits());
        }
    }
    tensor
}

/// Exact contraction into a dense statevector.
fn contract_statevector(circuit: &CircuitGraph) -> Statevector {
    let initial = Statevector::zero_state(circuit.num_qudits(), circuit.dim());
    Statevector::from_tensor(evolve_dense(circuit, initial.tensor().clone()))
}

/// Contraction into a matrix product state, truncating after every multi-qudit
/// operator.
fn contract_mps(circuit: &CircuitGraph, policy: &TruncationPolicy) -> SimulationResult<MpsState> {
    let mut mps = MpsState::zero_state(circuit.num_qudits(), circuit.dim())?;
    for (layer_index, layer) in circuit.layers().iter().enumerate() {
        debug!(layer = layer_index, operators = layer.len(); "Contracting layer");
        for &index in layer.operators() {
            let op = circuit.operator(index);
            trace!(operator = index, arity = op.arity(); "Applying operator");
            mps.apply_operator(op, policy).map_err(|failure| {
                failure.at(format!(
                    "layer {layer_index}, operator {index} on qudits {:?}",
                    op.qudits()
                ))
            })?;
        }
        debug!(layer = layer_index, max_bond = mps.max_bond_dim(); "Finished layer");
    }
    Ok(mps)
}

/// Contracts the whole circuit exactly into a single operator on all of its
/// qudits. The empty circuit yields the identity.
pub fn freeze_circuit(circuit: &CircuitGraph) -> SimulationResult<Operator> {
    let n = circuit.num_qudits();
    debug!(qudits = n, layers = circuit.depth(); "Freezing circuit into operator");
    let tensor = evolve_dense(circuit, DataTensor::identity(circuit.dim(), n));
    Operator::new(tensor, (0..n).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_scheme() {
        assert_eq!("time".parse::<ContractionScheme>(), Ok(ContractionScheme::Time));
        assert_eq!(" TIME ".parse::<ContractionScheme>(), Ok(ContractionScheme::Time));
        assert_eq!(
            "space".parse::<ContractionScheme>(),
            Err(SimulationError::UnsupportedScheme(String::from("space")))
        );
    }

    #[test]
    fn parse_representation() {
        assert_eq!("MPS".parse::<Representation>(), Ok(Representation::Mps));
        assert_eq!("sv".parse::<Representation>(), Ok(Representation::Statevector));
        assert_eq!(
            "peps".parse::<Representation>(),
            Err(SimulationError::UnsupportedRepresentation(String::from("peps")))
        );
    }

    #[test]
    fn negative_tolerance() {
        assert_eq!(
            ContractionConfig::mps(-1e-3),
            Err(SimulationError::InvalidTolerance(-1e-3))
        );
        assert!(matches!(
            ContractionConfig::mps(f64::NAN),
            Err(SimulationError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn zero_bond_cap() {
        let config = ContractionConfig::mps(0.0).unwrap().with_max_bond_dim(0);
        assert!(matches!(config.validate(), Err(SimulationError::DimensionMismatch(_))));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: ContractionConfig =
            serde_json::from_str(r#"{"representation": "mps", "eps": 1e-6}"#).unwrap();
        assert_eq!(config.scheme(), ContractionScheme::Time);
        assert_eq!(config.representation(), Representation::Mps);
        assert_eq!(config.max_bond_dim(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialized_config_is_validated() {
        let config: ContractionConfig =
            serde_json::from_str(r#"{"representation": "mps", "eps": -0.5}"#).unwrap();
        let circuit = CircuitGraph::new(1, 2).unwrap();
        assert_eq!(
            contract_circuit(&circuit, &config).unwrap_err(),
            SimulationError::InvalidTolerance(-0.5)
        );
    }

    #[test]
    fn unknown_representation_in_json() {
        assert!(
            serde_json::from_str::<ContractionConfig>(r#"{"representation": "peps"}"#).is_err()
        );
    }

    #[test]
    fn empty_circuit_freezes_to_identity() {
        let circuit = CircuitGraph::new(2, 3).unwrap();
        let op = freeze_circuit(&circuit).unwrap();
        assert_eq!(op.qudits(), &[0, 1]);
        assert_eq!(op.tensor(), &DataTensor::identity(3, 2));
    }
}
