pub mod contraction;
pub mod mps;
pub mod operator;
pub mod state;
pub mod statevector;
pub mod tensordata;
