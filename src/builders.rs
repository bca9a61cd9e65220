pub mod circuit_builder;
pub mod connectivity;
pub mod random_circuit;
