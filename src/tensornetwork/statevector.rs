//! Exact dense statevectors.
use num_complex::Complex64;

use crate::tensornetwork::{operator::Operator, tensordata::DataTensor};

/// The joint state of all qudits as a dense tensor of rank `n`, one axis of size
/// `d` per qudit.
#[derive(Debug, Clone, PartialEq)]
pub struct Statevector {
    tensor: DataTensor,
    dim: usize,
}

impl Statevector {
    /// The all-zero basis state.
    #[must_use]
    pub fn zero_state(qudits: usize, dim: usize) -> Self {
        Self::basis_state(dim, &vec![0; qudits])
    }

    /// The product basis state with the given level on each qudit.
    #[must_use]
    pub fn basis_state(dim: usize, levels: &[usize]) -> Self {
        Self {
            tensor: DataTensor::basis_state(dim, levels),
            dim,
        }
    }

    /// Wraps a tensor of shape `[d; n]`.
    ///
    /// # Panics
    /// Panics if the axes are not all of the same size.
    #[must_use]
    pub fn from_tensor(tensor: DataTensor) -> Self {
        let dim = tensor.shape().first().copied().unwrap_or(1);
        assert!(
            tensor.shape().iter().all(|&size| size == dim),
            "Statevector axes must all have the same size"
        );
        Self { tensor, dim }
    }

    #[inline]
    pub fn num_qudits(&self) -> usize {
        self.tensor.ndim()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn tensor(&self) -> &DataTensor {
        &self.tensor
    }

    /// Returns the amplitudes in row-major order, i.e. qudit 0 is the most
    /// significant digit of the basis index.
    #[inline]
    pub fn amplitudes(&self) -> &[Complex64] {
        self.tensor.elements()
    }

    /// Applies an operator in place. The operator's qudits must be valid for
    /// this state.
    pub fn apply_operator(&mut self, op: &Operator) {
        self.tensor = op.apply(&self.tensor, op.qudits());
    }

    /// Returns the amplitude of the given basis state.
    #[must_use]
    pub fn amplitude(&self, levels: &[usize]) -> Complex64 {
        self.tensor.get(levels)
    }

    #[must_use]
    pub fn norm_squared(&self) -> f64 {
        self.tensor.norm_squared()
    }

    /// Returns `<self|other>`.
    #[must_use]
    pub fn inner(&self, other: &Self) -> Complex64 {
        self.tensor.inner(&other.tensor)
    }

    /// Returns `<self|op|self>`.
    #[must_use]
    pub fn expected(&self, op: &Operator) -> Complex64 {
        let mut applied = self.clone();
        applied.apply_operator(op);
        self.inner(&applied)
    }
}
