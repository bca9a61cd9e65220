//! States produced by a contraction, and the queries they answer.
use num_complex::Complex64;

use crate::{
    error::{SimulationError, SimulationResult},
    tensornetwork::{
        contraction::Representation,
        mps::{MpsState, TruncationPolicy},
        operator::Operator,
        statevector::Statevector,
    },
};

/// The result of contracting a circuit.
///
/// Queries on an MPS are answered by sweeping over the chain; they never build
/// the dense statevector.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    Statevector(Statevector),
    Mps(MpsState),
}

impl State {
    #[inline]
    pub fn representation(&self) -> Representation {
        match self {
            Self::Statevector(_) => Representation::Statevector,
            Self::Mps(_) => Representation::Mps,
        }
    }

    pub fn num_qudits(&self) -> usize {
        match self {
            Self::Statevector(sv) => sv.num_qudits(),
            Self::Mps(mps) => mps.num_qudits(),
        }
    }

    pub fn dim(&self) -> usize {
        match self {
            Self::Statevector(sv) => sv.dim(),
            Self::Mps(mps) => mps.dim(),
        }
    }

    /// Returns the accumulated relative truncation error, always 0 for exact
    /// statevectors.
    pub fn truncation_error(&self) -> f64 {
        match self {
            Self::Statevector(_) => 0.0,
            Self::Mps(mps) => mps.truncation_error(),
        }
    }

    /// Returns the MPS bond dimensions, or `None` for a statevector.
    pub fn bond_dims(&self) -> Option<Vec<usize>> {
        match self {
            Self::Statevector(_) => None,
            Self::Mps(mps) => Some(mps.bond_dims()),
        }
    }

    /// Returns the amplitude of the basis state written as one digit per qudit,
    /// qudit 0 first. Levels above 9 are written as letters, as in base 36.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::{builders::circuit_builder::CircuitGraph, tensornetwork::contraction::ContractionConfig};
    /// let circuit = CircuitGraph::new(2, 2).unwrap();
    /// let state = circuit.contract(&ContractionConfig::statevector()).unwrap();
    /// assert_eq!(state.check_state("00").unwrap().re, 1.0);
    /// assert!(state.check_state("0").is_err());
    /// ```
    pub fn check_state(&self, bitstring: &str) -> SimulationResult<Complex64> {
        let expected = self.num_qudits();
        let got = bitstring.chars().count();
        if got != expected {
            return Err(SimulationError::LengthMismatch { expected, got });
        }
        let levels = bitstring
            .chars()
            .enumerate()
            .map(|(qudit, symbol)| {
                symbol
                    .to_digit(36)
                    .map(|level| level as usize)
                    .filter(|&level| level < self.dim())
                    .ok_or_else(|| SimulationError::InvalidBasisLabel {
                        qudit,
                        symbol: symbol.to_string(),
                        dim: self.dim(),
                    })
            })
            .collect::<SimulationResult<Vec<_>>>()?;
        self.amplitude(&levels)
    }

    /// Returns the amplitude of the basis state with the given level on each
    /// qudit.
    pub fn amplitude(&self, levels: &[usize]) -> SimulationResult<Complex64> {
        if levels.len() != self.num_qudits() {
            return Err(SimulationError::LengthMismatch {
                expected: self.num_qudits(),
                got: levels.len(),
            });
        }
        if let Some((qudit, &level)) = levels
            .iter()
            .enumerate()
            .find(|(_, &level)| level >= self.dim())
        {
            return Err(SimulationError::InvalidBasisLabel {
                qudit,
                symbol: level.to_string(),
                dim: self.dim(),
            });
        }
        Ok(match self {
            Self::Statevector(sv) => sv.amplitude(levels),
            Self::Mps(mps) => mps.amplitude(levels),
        })
    }

    /// Checks that `op` can act on this state.
    fn check_operator(&self, op: &Operator) -> SimulationResult<()> {
        if op.dim() != self.dim() {
            return Err(SimulationError::DimensionMismatch(format!(
                "operator on qudits {:?} has local dimension {}, but the state has {}",
                op.qudits(),
                op.dim(),
                self.dim()
            )));
        }
        if let Some(&qudit) = op.qudits().iter().find(|&&q| q >= self.num_qudits()) {
            return Err(SimulationError::IndexOutOfRange {
                qudit,
                qudits: self.num_qudits(),
            });
        }
        Ok(())
    }

    /// Returns `<state|op|state>`. The operator is applied to a copy of the
    /// state along the same path that produced it; for an MPS, `eps` controls
    /// the truncation of that application.
    pub fn expected(&self, op: &Operator, eps: f64) -> SimulationResult<Complex64> {
        self.expected_with(op, &uncapped(eps))
    }

    /// Like [`State::expected`], truncating an MPS application with `policy`.
    pub fn expected_with(
        &self,
        op: &Operator,
        policy: &TruncationPolicy,
    ) -> SimulationResult<Complex64> {
        policy.validate()?;
        self.check_operator(op)?;
        match self {
            Self::Statevector(sv) => Ok(sv.expected(op)),
            Self::Mps(mps) => mps.expected(op, policy).map_err(|failure| {
                failure.at(format!("expectation operator on qudits {:?}", op.qudits()))
            }),
        }
    }

    /// Returns a copy of the state with `op` applied.
    pub fn apply(&self, op: &Operator, eps: f64) -> SimulationResult<Self> {
        self.apply_with(op, &uncapped(eps))
    }

    /// Like [`State::apply`], truncating an MPS with `policy`.
    pub fn apply_with(&self, op: &Operator, policy: &TruncationPolicy) -> SimulationResult<Self> {
        policy.validate()?;
        self.check_operator(op)?;
        let mut out = self.clone();
        match &mut out {
            Self::Statevector(sv) => sv.apply_operator(op),
            Self::Mps(mps) => {
                mps.apply_operator(op, policy).map_err(|failure| {
                    failure.at(format!("operator on qudits {:?}", op.qudits()))
                })?;
            }
        }
        Ok(out)
    }

    /// Returns `<self|other>`. Mixed representations are compared densely.
    pub fn overlap(&self, other: &Self) -> SimulationResult<Complex64> {
        if self.num_qudits() != other.num_qudits() || self.dim() != other.dim() {
            return Err(SimulationError::DimensionMismatch(format!(
                "cannot overlap a state of {} qudits of dimension {} with one of {} qudits of dimension {}",
                self.num_qudits(),
                self.dim(),
                other.num_qudits(),
                other.dim()
            )));
        }
        Ok(match (self, other) {
            (Self::Mps(a), Self::Mps(b)) => a.inner(b),
            _ => self.to_statevector().inner(&other.to_statevector()),
        })
    }

    /// Returns the squared norm, 1 up to rounding for unitary circuits.
    pub fn norm_squared(&self) -> f64 {
        match self {
            Self::Statevector(sv) => sv.norm_squared(),
            Self::Mps(mps) => mps.norm_squared(),
        }
    }

    /// Returns the state as a dense statevector, contracting the chain if
    /// necessary.
    pub fn to_statevector(&self) -> Statevector {
        match self {
            Self::Statevector(sv) => sv.clone(),
            Self::Mps(mps) => mps.to_statevector(),
        }
    }

    /// Recompresses an MPS with the given tolerance; statevectors are returned
    /// unchanged.
    pub fn compress(&self, eps: f64) -> SimulationResult<Self> {
        self.compress_with(&uncapped(eps))
    }

    /// Like [`State::compress`], failing if a bond would exceed the cap of
    /// `policy`.
    pub fn compress_with(&self, policy: &TruncationPolicy) -> SimulationResult<Self> {
        policy.validate()?;
        match self {
            Self::Statevector(_) => Ok(self.clone()),
            Self::Mps(mps) => mps
                .compress(policy)
                .map(Self::Mps)
                .map_err(|failure| failure.at("recompression sweep")),
        }
    }
}

fn uncapped(eps: f64) -> TruncationPolicy {
    TruncationPolicy {
        eps,
        max_bond_dim: None,
    }
}
