//! Registry of named gate tensors, plus generalized qudit gates.
//!
//! All gate tensors follow the [`Operator`](crate::tensornetwork::operator::Operator)
//! layout: shape `[d; 2k]` with the output axes first, i.e. the flat data is the
//! row-major gate matrix.
use lazy_static::lazy_static;
use num_complex::Complex64;

use std::{
    borrow::Borrow,
    collections::HashSet,
    f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4, PI},
    hash::{Hash, Hasher},
    sync::{PoisonError, RwLock},
};

use crate::{
    error::{SimulationError, SimulationResult},
    tensornetwork::tensordata::DataTensor,
};

lazy_static! {
    static ref GATES: RwLock<HashSet<Box<dyn Gate>>> = {
        let mut gates = HashSet::new();
        gates.insert(Box::new(X) as _);
        gates.insert(Box::new(Y) as _);
        gates.insert(Box::new(Z) as _);
        gates.insert(Box::new(H) as _);
        gates.insert(Box::new(S) as _);
        gates.insert(Box::new(T) as _);
        gates.insert(Box::new(Sx) as _);
        gates.insert(Box::new(Sy) as _);
        gates.insert(Box::new(Sz) as _);
        gates.insert(Box::new(Rx) as _);
        gates.insert(Box::new(Ry) as _);
        gates.insert(Box::new(Rz) as _);
        gates.insert(Box::new(U) as _);
        gates.insert(Box::new(Cx) as _);
        gates.insert(Box::new(Cz) as _);
        gates.insert(Box::new(Swap) as _);
        gates.insert(Box::new(Fsim) as _);
        RwLock::new(gates)
    };
}

/// Registers a gate definition to resolve a gate name to a gate implementation.
/// A gate with the same name is replaced.
///
/// # Panics
/// Panics if the gate name is not lowercase.
pub fn register_gate(gate: Box<dyn Gate>) {
    assert!(
        gate.name().to_ascii_lowercase() == gate.name(),
        "Gate name must be lowercase."
    );
    let mut gates = GATES.write().unwrap_or_else(PoisonError::into_inner);
    gates.replace(gate);
}

/// Computes the gate tensor for the given gate and angles.
pub fn load_gate(gate: &str, angles: &[f64]) -> SimulationResult<DataTensor> {
    let gates = GATES.read().unwrap_or_else(PoisonError::into_inner);
    let gate = gates
        .get(gate)
        .ok_or_else(|| SimulationError::UnknownGate(gate.to_string()))?;
    if gate.angles() != angles.len() {
        return Err(SimulationError::InvalidGateAngles {
            gate: gate.name().to_string(),
            expected: gate.angles(),
            got: angles.len(),
        });
    }
    Ok(gate.compute(angles))
}

/// Returns whether the given gate is known.
#[must_use]
pub fn is_gate_known(gate: &str) -> bool {
    let gates = GATES.read().unwrap_or_else(PoisonError::into_inner);
    gates.contains(gate)
}

/// A quantum gate.
pub trait Gate: Send + Sync {
    /// Returns the name of the gate.
    fn name(&self) -> &str;

    /// Returns the number of angles the gate takes.
    fn angles(&self) -> usize {
        0
    }

    /// Computes the gate tensor with the given angles. The number of angles has
    /// already been checked against [`Gate::angles`].
    fn compute(&self, angles: &[f64]) -> DataTensor;
}

impl PartialEq for dyn Gate {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for dyn Gate {}

impl Hash for dyn Gate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

/// This allows us to use a `&str` as a key in a `HashSet` of gates.
impl Borrow<str> for Box<dyn Gate> {
    fn borrow(&self) -> &str {
        self.name()
    }
}

fn single(data: [Complex64; 4]) -> DataTensor {
    DataTensor::new_from_flat(&[2, 2], data.to_vec())
}

fn diagonal(entries: &[Complex64]) -> DataTensor {
    let size = entries.len();
    let qubits = size.trailing_zeros() as usize;
    let mut data = vec![Complex64::ZERO; size * size];
    for (i, entry) in entries.iter().enumerate() {
        data[i * size + i] = *entry;
    }
    DataTensor::new_from_flat(&vec![2; 2 * qubits], data)
}

/// The Pauli-X gate.
struct X;
impl Gate for X {
    fn name(&self) -> &str {
        "x"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let data = [
            z, o,
            o, z,
        ];
        single(data)
    }
}

/// The Pauli-Y gate.
struct Y;
impl Gate for Y {
    fn name(&self) -> &str {
        "y"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let z = Complex64::ZERO;
        let i = Complex64::I;
        #[rustfmt::skip]
        let data = [
            z, -i,
            i,  z,
        ];
        single(data)
    }
}

/// The Pauli-Z gate.
struct Z;
impl Gate for Z {
    fn name(&self) -> &str {
        "z"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        diagonal(&[Complex64::ONE, -Complex64::ONE])
    }
}

/// The Hadamard gate.
struct H;
impl Gate for H {
    fn name(&self) -> &str {
        "h"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
        #[rustfmt::skip]
        let data = [
            h,  h,
            h, -h,
        ];
        single(data)
    }
}

/// The phase gate.
struct S;
impl Gate for S {
    fn name(&self) -> &str {
        "s"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        diagonal(&[Complex64::ONE, Complex64::I])
    }
}

/// The T gate.
struct T;
impl Gate for T {
    fn name(&self) -> &str {
        "t"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        diagonal(&[Complex64::ONE, Complex64::from_polar(1.0, FRAC_PI_4)])
    }
}

/// The square-root of X gate.
struct Sx;
impl Gate for Sx {
    fn name(&self) -> &str {
        "sx"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let a = Complex64::new(0.5, 0.5);
        let b = Complex64::new(0.5, -0.5);
        #[rustfmt::skip]
        let data = [
            a, b,
            b, a,
        ];
        single(data)
    }
}

/// The square-root of Y gate.
struct Sy;
impl Gate for Sy {
    fn name(&self) -> &str {
        "sy"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let a = Complex64::new(0.5, 0.5);
        let b = Complex64::new(-0.5, -0.5);
        #[rustfmt::skip]
        let data = [
            a, b,
            a, a,
        ];
        single(data)
    }
}

/// The square-root of Z gate.
struct Sz;
impl Gate for Sz {
    fn name(&self) -> &str {
        "sz"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        diagonal(&[Complex64::ONE, Complex64::I])
    }
}

/// Rotation around the X axis.
struct Rx;
impl Gate for Rx {
    fn name(&self) -> &str {
        "rx"
    }

    fn angles(&self) -> usize {
        1
    }

    fn compute(&self, angles: &[f64]) -> DataTensor {
        let (sin, cos) = (angles[0] / 2.0).sin_cos();
        let c = Complex64::new(cos, 0.0);
        let s = Complex64::new(0.0, -sin);
        #[rustfmt::skip]
        let data = [
            c, s,
            s, c,
        ];
        single(data)
    }
}

/// Rotation around the Y axis.
struct Ry;
impl Gate for Ry {
    fn name(&self) -> &str {
        "ry"
    }

    fn angles(&self) -> usize {
        1
    }

    fn compute(&self, angles: &[f64]) -> DataTensor {
        let (sin, cos) = (angles[0] / 2.0).sin_cos();
        let c = Complex64::new(cos, 0.0);
        let s = Complex64::new(sin, 0.0);
        #[rustfmt::skip]
        let data = [
            c, -s,
            s,  c,
        ];
        single(data)
    }
}

/// Rotation around the Z axis.
struct Rz;
impl Gate for Rz {
    fn name(&self) -> &str {
        "rz"
    }

    fn angles(&self) -> usize {
        1
    }

    fn compute(&self, angles: &[f64]) -> DataTensor {
        let half = angles[0] / 2.0;
        diagonal(&[
            Complex64::from_polar(1.0, -half),
            Complex64::from_polar(1.0, half),
        ])
    }
}

/// The U gate with three parameters, following the [OpenQASM 3.0 specification](https://openqasm.com/language/gates.html#built-in-gates).
struct U;
impl Gate for U {
    fn name(&self) -> &str {
        "u"
    }

    fn angles(&self) -> usize {
        3
    }

    fn compute(&self, angles: &[f64]) -> DataTensor {
        let [theta, phi, lambda] = angles else {
            unreachable!("angle count is checked by load_gate")
        };
        let (sin, cos) = (theta / 2.0).sin_cos();
        single([
            Complex64::new(cos, 0.0),
            -(Complex64::I * lambda).exp() * sin,
            (Complex64::I * phi).exp() * sin,
            (Complex64::I * (phi + lambda)).exp() * cos,
        ])
    }
}

/// The controlled-X gate, control on the first qubit.
struct Cx;
impl Gate for Cx {
    fn name(&self) -> &str {
        "cx"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        controlled_shift(2)
    }
}

/// The controlled-Z gate.
struct Cz;
impl Gate for Cz {
    fn name(&self) -> &str {
        "cz"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let o = Complex64::ONE;
        diagonal(&[o, o, o, -o])
    }
}

/// The SWAP gate.
struct Swap;
impl Gate for Swap {
    fn name(&self) -> &str {
        "swap"
    }

    fn compute(&self, _: &[f64]) -> DataTensor {
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        #[rustfmt::skip]
        let data = vec![
            o, z, z, z,
            z, z, o, z,
            z, o, z, z,
            z, z, z, o,
        ];
        DataTensor::new_from_flat(&[2, 2, 2, 2], data)
    }
}

/// The FSIM gate, as described e.g. [here](https://quantumai.google/reference/python/cirq/FSimGate).
struct Fsim;
impl Gate for Fsim {
    fn name(&self) -> &str {
        "fsim"
    }

    fn angles(&self) -> usize {
        2
    }

    fn compute(&self, angles: &[f64]) -> DataTensor {
        let [theta, phi] = angles else {
            unreachable!("angle count is checked by load_gate")
        };
        let z = Complex64::ZERO;
        let o = Complex64::ONE;
        let a = Complex64::new(theta.cos(), 0.0);
        let b = Complex64::new(0.0, -theta.sin());
        let c = Complex64::new(0.0, -phi).exp();
        #[rustfmt::skip]
        let data = vec![
            o, z, z, z,
            z, a, b, z,
            z, b, a, z,
            z, z, z, c,
        ];
        DataTensor::new_from_flat(&[2, 2, 2, 2], data)
    }
}

/// The generalized X gate on a qudit of dimension `dim`: `|j> -> |j + 1 mod dim>`.
#[must_use]
pub fn shift(dim: usize) -> DataTensor {
    let mut data = vec![Complex64::ZERO; dim * dim];
    for j in 0..dim {
        data[((j + 1) % dim) * dim + j] = Complex64::ONE;
    }
    DataTensor::new_from_flat(&[dim, dim], data)
}

/// The generalized Z gate on a qudit of dimension `dim`: `|j> -> w^j |j>` with
/// `w = exp(2 pi i / dim)`.
#[must_use]
pub fn clock(dim: usize) -> DataTensor {
    let mut data = vec![Complex64::ZERO; dim * dim];
    for j in 0..dim {
        data[j * dim + j] = Complex64::from_polar(1.0, 2.0 * PI * j as f64 / dim as f64);
    }
    DataTensor::new_from_flat(&[dim, dim], data)
}

/// The quantum Fourier transform on a single qudit, which reduces to the
/// Hadamard gate for `dim = 2`.
#[must_use]
pub fn fourier(dim: usize) -> DataTensor {
    let norm = (dim as f64).sqrt().recip();
    let data = (0..dim * dim)
        .map(|i| {
            let (j, k) = (i / dim, i % dim);
            Complex64::from_polar(norm, 2.0 * PI * ((j * k) % dim) as f64 / dim as f64)
        })
        .collect();
    DataTensor::new_from_flat(&[dim, dim], data)
}

/// The two-qudit SUM gate `|c, t> -> |c, t + c mod dim>`, which reduces to the
/// controlled-X gate for `dim = 2`.
#[must_use]
pub fn controlled_shift(dim: usize) -> DataTensor {
    let size = dim * dim;
    let mut data = vec![Complex64::ZERO; size * size];
    for c in 0..dim {
        for t in 0..dim {
            let input = c * dim + t;
            let output = c * dim + (t + c) % dim;
            data[output * size + input] = Complex64::ONE;
        }
    }
    DataTensor::new_from_flat(&[dim; 4], data)
}
