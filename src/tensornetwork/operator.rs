//! Operators: immutable gate tensors bound to an ordered list of qudits.
use itertools::Itertools;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::{
    error::{SimulationError, SimulationResult},
    tensornetwork::tensordata::{argsort, DataTensor},
};

/// A gate tensor acting on a fixed, ordered list of qudits.
///
/// A `k`-qudit operator on qudits of dimension `d` is a tensor of shape
/// `[d; 2k]`. The first `k` axes are the outputs, the last `k` axes the inputs,
/// so the flat data is the row-major `d^k x d^k` matrix `M[out, in]`. Output and
/// input axis `i` both belong to `qudits[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operator {
    tensor: DataTensor,
    qudits: Vec<usize>,
    dim: usize,
}

impl Operator {
    /// Creates an operator from a tensor and the qudits it acts on.
    ///
    /// Fails with [`SimulationError::DimensionMismatch`] if the tensor is not of
    /// shape `[d; 2k]` for `k = qudits.len()` and some `d >= 2`, and with
    /// [`SimulationError::DuplicateQudit`] if a qudit is listed twice.
    ///
    /// # Examples
    /// ```
    /// # use tnsim::{gates::load_gate, tensornetwork::operator::Operator};
    /// let cx = Operator::new(load_gate("cx", &[]).unwrap(), vec![0, 1]).unwrap();
    /// assert_eq!(cx.arity(), 2);
    /// assert_eq!(cx.dim(), 2);
    /// ```
    pub fn new(tensor: DataTensor, qudits: Vec<usize>) -> SimulationResult<Self> {
        let k = qudits.len();
        if k == 0 {
            return Err(SimulationError::DimensionMismatch(String::from(
                "an operator must act on at least one qudit",
            )));
        }
        if tensor.ndim() != 2 * k {
            return Err(SimulationError::DimensionMismatch(format!(
                "operator on qudits {qudits:?} needs a tensor of rank {}, got shape {:?}",
                2 * k,
                tensor.shape()
            )));
        }
        let dim = tensor.shape()[0];
        if dim < 2 || tensor.shape().iter().any(|&size| size != dim) {
            return Err(SimulationError::DimensionMismatch(format!(
                "operator on qudits {qudits:?} has shape {:?}, expected all axes of one size d >= 2",
                tensor.shape()
            )));
        }
        if let Some(&qudit) = qudits.iter().duplicates().next() {
            return Err(SimulationError::DuplicateQudit(qudit));
        }
        Ok(Self {
            tensor,
            qudits,
            dim,
        })
    }

    /// Creates an operator from its flat row-major `d^k x d^k` matrix.
    pub fn from_matrix(
        dim: usize,
        qudits: Vec<usize>,
        matrix: Vec<Complex64>,
    ) -> SimulationResult<Self> {
        let shape = vec![dim; 2 * qudits.len()];
        if shape.iter().product::<usize>() != matrix.len() {
            return Err(SimulationError::DimensionMismatch(format!(
                "a {}-qudit operator of dimension {dim} needs {} matrix entries, got {}",
                qudits.len(),
                shape.iter().product::<usize>(),
                matrix.len()
            )));
        }
        Self::new(DataTensor::new_from_flat(&shape, matrix), qudits)
    }

    /// The identity on the given qudits.
    pub fn identity(dim: usize, qudits: Vec<usize>) -> SimulationResult<Self> {
        Self::new(DataTensor::identity(dim, qudits.len()), qudits)
    }

    /// Returns the number of qudits the operator acts on.
    #[inline]
    pub fn arity(&self) -> usize {
        self.qudits.len()
    }

    /// Returns the qudits the operator acts on.
    #[inline]
    pub fn qudits(&self) -> &[usize] {
        &self.qudits
    }

    /// Returns the local dimension of each qudit.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn tensor(&self) -> &DataTensor {
        &self.tensor
    }

    #[inline]
    pub fn into_tensor(self) -> DataTensor {
        self.tensor
    }

    /// Returns the same operator placed on other qudits.
    pub fn retarget(&self, qudits: Vec<usize>) -> SimulationResult<Self> {
        Self::new(self.tensor.clone(), qudits)
    }

    /// Returns the conjugate transpose.
    #[must_use]
    pub fn adjoint(&self) -> Self {
        let k = self.arity();
        let swapped = (k..2 * k).chain(0..k).collect_vec();
        let mut tensor = self.tensor.transpose(&swapped);
        tensor.conjugate();
        Self {
            tensor,
            qudits: self.qudits.clone(),
            dim: self.dim,
        }
    }

    /// Applies the operator to `fragment`, where `axes[i]` is the fragment axis
    /// holding `qudits[i]`. The inputs are contracted with those axes and the
    /// outputs take their place, so the returned tensor has the same axis order
    /// as `fragment`.
    #[must_use]
    pub fn apply(&self, fragment: &DataTensor, axes: &[usize]) -> DataTensor {
        let k = self.arity();
        assert_eq!(axes.len(), k, "Operator of arity {k} applied to {} axes", axes.len());

        let inputs = (k..2 * k).collect_vec();
        let contracted = self.tensor.tensordot(&inputs, fragment, axes);

        // `contracted` has the outputs first, then the untouched axes in order
        let labels = axes
            .iter()
            .copied()
            .chain((0..fragment.ndim()).filter(|a| !axes.contains(a)))
            .collect_vec();
        contracted.transpose(&argsort(&labels))
    }
}
