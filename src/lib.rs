//! Quantum circuit simulation by contracting a time-ordered tensor network,
//! either exactly into a dense statevector or approximately into a truncated
//! matrix product state.
//!
//! # Examples
//! ```
//! # use tnsim::{builders::circuit_builder::CircuitGraph, gates::load_gate};
//! # use tnsim::tensornetwork::contraction::ContractionConfig;
//! let mut circuit = CircuitGraph::qubits(2).unwrap();
//! circuit.append_operator(load_gate("h", &[]).unwrap(), &[0]).unwrap();
//! circuit.append_operator(load_gate("cx", &[]).unwrap(), &[0, 1]).unwrap();
//!
//! let state = circuit.contract(&ContractionConfig::mps(1e-12).unwrap()).unwrap();
//! let amplitude = state.check_state("11").unwrap();
//! assert!((amplitude.re - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
//! ```

pub mod builders;
pub mod error;
pub mod gates;
pub mod tensornetwork;
mod utils;
