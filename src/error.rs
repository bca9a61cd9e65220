//! Errors reported by circuit construction, contraction and state queries.
use thiserror::Error;

/// Everything that can go wrong while building, contracting or querying a
/// circuit.
///
/// Structural errors are reported by the call that introduces them, before any
/// contraction work is done. [`SimulationError::TruncationCapExceeded`] and
/// [`SimulationError::DecompositionFailed`] are the only errors raised
/// mid-contraction; they abort that contraction and leave the circuit
/// untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// A tensor shape does not fit the declared arity or local dimension.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// A qudit index lies outside `0..qudits`.
    #[error("qudit index {qudit} is out of range for a system of {qudits} qudits")]
    IndexOutOfRange { qudit: usize, qudits: usize },

    /// The same qudit was listed twice for one operator.
    #[error("qudit {0} appears more than once in the operator's qudit list")]
    DuplicateQudit(usize),

    /// A basis label does not have one entry per qudit.
    #[error("basis label has length {got}, but the system has {expected} qudits")]
    LengthMismatch { expected: usize, got: usize },

    /// A basis label contains a symbol that is not a valid level of the qudit.
    #[error("invalid level '{symbol}' for qudit {qudit} of local dimension {dim}")]
    InvalidBasisLabel {
        qudit: usize,
        symbol: String,
        dim: usize,
    },

    /// Only the time-ordered contraction scheme is available.
    #[error("unsupported contraction scheme '{0}'")]
    UnsupportedScheme(String),

    /// Only the statevector and MPS representations are available.
    #[error("unsupported state representation '{0}'")]
    UnsupportedRepresentation(String),

    /// The truncation tolerance must be a non-negative number.
    #[error("invalid truncation tolerance {0}, expected a non-negative number")]
    InvalidTolerance(f64),

    /// Meeting the tolerance would need a bond larger than the configured cap.
    #[error("{location}: bond {bond} needs dimension {required} to meet the tolerance, exceeding the cap of {cap}")]
    TruncationCapExceeded {
        location: String,
        bond: usize,
        required: usize,
        cap: usize,
    },

    /// The SVD of a merged MPS block failed or did not reproduce the block.
    #[error("{location}: the decomposition at bond {bond} is inaccurate")]
    DecompositionFailed { location: String, bond: usize },

    /// A system needs at least one qudit.
    #[error("a circuit needs at least one qudit")]
    EmptySystem,

    /// No gate with this name is registered.
    #[error("gate '{0}' not found")]
    UnknownGate(String),

    /// A registered gate was asked for with the wrong number of angles.
    #[error("gate '{gate}' expects {expected} angle(s), got {got}")]
    InvalidGateAngles {
        gate: String,
        expected: usize,
        got: usize,
    },

    /// A gate placement probability outside `[0, 1]`.
    #[error("invalid probability {0}, expected a value in [0, 1]")]
    InvalidProbability(f64),
}

/// Result type used throughout the crate.
pub type SimulationResult<T> = Result<T, SimulationError>;
