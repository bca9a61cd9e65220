//! Dense complex tensors stored in row-major order.
use std::iter::zip;

use float_cmp::{ApproxEq, F64Margin};
use itertools::Itertools;
use nalgebra::DMatrix;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A dense tensor of complex numbers. The last axis varies fastest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTensor {
    shape: Vec<usize>,
    data: Vec<Complex64>,
}

/// Row-major strides for `shape`.
fn strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for axis in (0..shape.len().saturating_sub(1)).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }
    strides
}

/// Returns the axis order that sorts `labels` in increasing order.
pub(crate) fn argsort(labels: &[usize]) -> Vec<usize> {
    let positions = (0..labels.len()).collect_vec();
    permutation::sort(labels).apply_slice(positions.as_slice())
}

impl DataTensor {
    /// Creates a tensor from flat row-major data.
    ///
    /// # Examples
    /// ```
    /// # use num_complex::Complex64;
    /// # use tnsim::tensornetwork::tensordata::DataTensor;
    /// let t = DataTensor::new_from_flat(&[2, 1], vec![Complex64::ONE, Complex64::I]);
    /// assert_eq!(t.get(&[1, 0]), Complex64::I);
    /// ```
    ///
    /// # Panics
    /// Panics if the length of `data` does not match the shape.
    #[must_use]
    pub fn new_from_flat(shape: &[usize], data: Vec<Complex64>) -> Self {
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "Data length does not match shape {shape:?}"
        );
        Self {
            shape: shape.to_vec(),
            data,
        }
    }

    /// Creates a tensor of the given shape filled with zeros.
    #[must_use]
    pub fn zeros(shape: &[usize]) -> Self {
        let len = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            data: vec![Complex64::ZERO; len],
        }
    }

    /// Creates a rank-0 tensor holding `value`.
    #[must_use]
    pub fn scalar(value: Complex64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Creates the identity on `k` qudits of dimension `dim` as a tensor of
    /// shape `[dim; 2k]`, with the output axes first.
    #[must_use]
    pub fn identity(dim: usize, k: usize) -> Self {
        let size = dim.pow(k as u32);
        let mut data = vec![Complex64::ZERO; size * size];
        for i in 0..size {
            data[i * size + i] = Complex64::ONE;
        }
        Self {
            shape: vec![dim; 2 * k],
            data,
        }
    }

    /// Creates the product basis state with the given level on each axis.
    #[must_use]
    pub fn basis_state(dim: usize, levels: &[usize]) -> Self {
        let mut tensor = Self::zeros(&vec![dim; levels.len()]);
        let index = tensor.flat_index(levels);
        tensor.data[index] = Complex64::ONE;
        tensor
    }

    /// Builds a tensor of `shape` from a matrix whose rows enumerate the leading
    /// axes and whose columns enumerate the trailing axes.
    #[must_use]
    pub fn from_matrix(matrix: &DMatrix<Complex64>, shape: &[usize]) -> Self {
        // nalgebra is column-major, the transpose has the row-major layout
        Self::new_from_flat(shape, matrix.transpose().as_slice().to_vec())
    }

    /// Returns the shape of the tensor.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of axes.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Returns the number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the tensor has no elements, i.e. one of its axes has size 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the flat row-major data.
    #[inline]
    pub fn elements(&self) -> &[Complex64] {
        &self.data
    }

    /// Consumes the tensor and returns the flat row-major data.
    #[inline]
    pub fn into_elements(self) -> Vec<Complex64> {
        self.data
    }

    fn flat_index(&self, index: &[usize]) -> usize {
        assert_eq!(index.len(), self.ndim(), "Index has wrong rank");
        zip(index, zip(&self.shape, strides(&self.shape)))
            .map(|(&i, (&size, stride))| {
                assert!(i < size, "Index {index:?} out of bounds for shape {:?}", self.shape);
                i * stride
            })
            .sum()
    }

    /// Returns the element at the given multi-index.
    #[must_use]
    pub fn get(&self, index: &[usize]) -> Complex64 {
        self.data[self.flat_index(index)]
    }

    /// Reinterprets the data with a new shape of the same size.
    #[must_use]
    pub fn reshape(self, shape: &[usize]) -> Self {
        Self::new_from_flat(shape, self.data)
    }

    /// Returns the tensor with permuted axes: axis `i` of the result is axis
    /// `axes[i]` of `self`.
    #[must_use]
    pub fn transpose(&self, axes: &[usize]) -> Self {
        assert_eq!(axes.len(), self.ndim(), "Permutation has wrong length");
        assert!(
            axes.iter().all_unique() && axes.iter().all(|&a| a < self.ndim()),
            "Invalid permutation {axes:?}"
        );
        if axes.iter().enumerate().all(|(i, &a)| i == a) {
            return self.clone();
        }

        let old_strides = strides(&self.shape);
        let shape = axes.iter().map(|&a| self.shape[a]).collect_vec();
        let steps = axes.iter().map(|&a| old_strides[a]).collect_vec();

        let mut data = Vec::with_capacity(self.len());
        let mut index = vec![0; shape.len()];
        let mut offset = 0;
        for _ in 0..self.len() {
            data.push(self.data[offset]);
            for axis in (0..shape.len()).rev() {
                index[axis] += 1;
                offset += steps[axis];
                if index[axis] < shape[axis] {
                    break;
                }
                offset -= steps[axis] * shape[axis];
                index[axis] = 0;
            }
        }
        Self { shape, data }
    }

    /// Complex-conjugates all elements in place.
    pub fn conjugate(&mut self) {
        self.data.iter_mut().for_each(|c| *c = c.conj());
    }

    /// Multiplies all elements by `factor` in place.
    pub fn scale(&mut self, factor: Complex64) {
        self.data.iter_mut().for_each(|c| *c *= factor);
    }

    /// Returns the squared Frobenius norm.
    #[must_use]
    pub fn norm_squared(&self) -> f64 {
        self.data.iter().map(Complex64::norm_sqr).sum()
    }

    /// Returns `sum(conj(self) * other)` over all elements.
    #[must_use]
    pub fn inner(&self, other: &Self) -> Complex64 {
        assert_eq!(self.shape, other.shape, "Inner product of differently shaped tensors");
        zip(&self.data, &other.data).map(|(a, b)| a.conj() * b).sum()
    }

    /// Views the tensor as a `rows x (len / rows)` matrix.
    #[must_use]
    pub fn to_matrix(&self, rows: usize) -> DMatrix<Complex64> {
        assert!(rows > 0 && self.len() % rows == 0, "Cannot split tensor into {rows} rows");
        DMatrix::from_row_slice(rows, self.len() / rows, &self.data)
    }

    /// Contracts `axes_a` of `self` with `axes_b` of `other`.
    ///
    /// The result carries the free axes of `self` in order, followed by the free
    /// axes of `other` in order.
    ///
    /// # Examples
    /// ```
    /// # use num_complex::Complex64;
    /// # use tnsim::tensornetwork::tensordata::DataTensor;
    /// let a = DataTensor::new_from_flat(&[2, 3], vec![Complex64::ONE; 6]);
    /// let b = DataTensor::new_from_flat(&[3], vec![Complex64::ONE; 3]);
    /// let c = a.tensordot(&[1], &b, &[0]);
    /// assert_eq!(c.shape(), &[2]);
    /// assert_eq!(c.get(&[1]), Complex64::new(3.0, 0.0));
    /// ```
    #[must_use]
    pub fn tensordot(&self, axes_a: &[usize], other: &Self, axes_b: &[usize]) -> Self {
        assert_eq!(axes_a.len(), axes_b.len(), "Contracted axes do not pair up");
        for (&a, &b) in zip(axes_a, axes_b) {
            assert_eq!(
                self.shape[a], other.shape[b],
                "Cannot contract axis {a} of size {} with axis {b} of size {}",
                self.shape[a], other.shape[b]
            );
        }

        let free_a = (0..self.ndim()).filter(|a| !axes_a.contains(a)).collect_vec();
        let free_b = (0..other.ndim()).filter(|b| !axes_b.contains(b)).collect_vec();
        let rows = free_a.iter().map(|&a| self.shape[a]).product();
        let inner = axes_a.iter().map(|&a| self.shape[a]).product();
        let cols = free_b.iter().map(|&b| other.shape[b]).product();

        let order_a = free_a.iter().chain(axes_a).copied().collect_vec();
        let order_b = axes_b.iter().chain(&free_b).copied().collect_vec();
        let lhs = DMatrix::from_row_slice(rows, inner, &self.transpose(&order_a).data);
        let rhs = DMatrix::from_row_slice(inner, cols, &other.transpose(&order_b).data);

        let shape = free_a
            .iter()
            .map(|&a| self.shape[a])
            .chain(free_b.iter().map(|&b| other.shape[b]))
            .collect_vec();
        Self::from_matrix(&(lhs * rhs), &shape)
    }
}

impl ApproxEq for &DataTensor {
    type Margin = F64Margin;

    fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
        let margin = margin.into();
        self.shape == other.shape
            && zip(&self.data, &other.data)
                .all(|(l, r)| l.re.approx_eq(r.re, margin) && l.im.approx_eq(r.im, margin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use float_cmp::assert_approx_eq;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn counting(shape: &[usize]) -> DataTensor {
        let len = shape.iter().product::<usize>();
        DataTensor::new_from_flat(shape, (0..len).map(|i| c(i as f64, 0.0)).collect())
    }

    #[test]
    fn strides_row_major() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(strides(&[5]), vec![1]);
        assert!(strides(&[]).is_empty());
    }

    #[test]
    fn argsort_labels() {
        assert_eq!(argsort(&[2, 0, 1]), vec![1, 2, 0]);
        assert_eq!(argsort(&[0, 1, 2]), vec![0, 1, 2]);
        assert_eq!(argsort(&[3, 1, 0, 2]), vec![2, 1, 3, 0]);
    }

    #[test]
    #[should_panic(expected = "Data length does not match shape")]
    fn wrong_data_length() {
        let _ = DataTensor::new_from_flat(&[2, 2], vec![Complex64::ONE; 3]);
    }

    #[test]
    fn transpose_matrix() {
        let t = counting(&[2, 3]);
        let tt = t.transpose(&[1, 0]);
        assert_eq!(tt.shape(), &[3, 2]);
        for i in 0..2 {
            for j in 0..3 {
                assert_eq!(t.get(&[i, j]), tt.get(&[j, i]));
            }
        }
    }

    #[test]
    fn transpose_rank3() {
        let t = counting(&[2, 3, 4]);
        let tt = t.transpose(&[2, 0, 1]);
        assert_eq!(tt.shape(), &[4, 2, 3]);
        for i in 0..2 {
            for j in 0..3 {
                for k in 0..4 {
                    assert_eq!(t.get(&[i, j, k]), tt.get(&[k, i, j]));
                }
            }
        }
    }

    #[test]
    fn tensordot_matrix_product() {
        // [[1, 2], [3, 4]] * [[0, 1], [1, 0]]
        let a = DataTensor::new_from_flat(&[2, 2], vec![c(1., 0.), c(2., 0.), c(3., 0.), c(4., 0.)]);
        let b = DataTensor::new_from_flat(&[2, 2], vec![c(0., 0.), c(1., 0.), c(1., 0.), c(0., 0.)]);
        let ab = a.tensordot(&[1], &b, &[0]);
        let expected =
            DataTensor::new_from_flat(&[2, 2], vec![c(2., 0.), c(1., 0.), c(4., 0.), c(3., 0.)]);
        assert_approx_eq!(&DataTensor, &ab, &expected);
    }

    #[test]
    fn tensordot_outer_product() {
        let a = DataTensor::new_from_flat(&[3], vec![c(1.0, 0.0), c(2.0, 5.0), c(3.0, -1.0)]);
        let b = DataTensor::new_from_flat(&[2], vec![c(-4.0, 2.0), c(0.0, -1.0)]);
        let ba = b.tensordot(&[], &a, &[]);
        let expected = DataTensor::new_from_flat(
            &[2, 3],
            vec![
                c(-4.0, 2.0),
                c(-18.0, -16.0),
                c(-10.0, 10.0),
                c(0.0, -1.0),
                c(5.0, -2.0),
                c(-1.0, -3.0),
            ],
        );
        assert_approx_eq!(&DataTensor, &ba, &expected, epsilon = 1e-12);
    }

    #[test]
    fn tensordot_multiple_axes() {
        let a = counting(&[2, 3, 4]);
        let b = counting(&[4, 2, 5]);
        let out = a.tensordot(&[0, 2], &b, &[1, 0]);
        assert_eq!(out.shape(), &[3, 5]);
        for j in 0..3 {
            for m in 0..5 {
                let mut expected = Complex64::ZERO;
                for i in 0..2 {
                    for k in 0..4 {
                        expected += a.get(&[i, j, k]) * b.get(&[k, i, m]);
                    }
                }
                assert_approx_eq!(f64, out.get(&[j, m]).re, expected.re, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn full_contraction_is_scalar() {
        let a = counting(&[2, 2]);
        let out = a.tensordot(&[0, 1], &a, &[0, 1]);
        assert_eq!(out.ndim(), 0);
        assert_approx_eq!(f64, out.get(&[]).re, 14.0);
    }

    #[test]
    fn matrix_roundtrip_keeps_layout() {
        let t = counting(&[2, 3, 2]);
        let m = t.to_matrix(2);
        assert_eq!(m.shape(), (2, 6));
        assert_eq!(m[(1, 4)], t.get(&[1, 2, 0]));
        let back = DataTensor::from_matrix(&m, &[2, 3, 2]);
        assert_eq!(back, t);
    }

    #[test]
    fn identity_and_basis() {
        let id = DataTensor::identity(3, 1);
        assert_eq!(id.shape(), &[3, 3]);
        assert_eq!(id.get(&[2, 2]), Complex64::ONE);
        assert_eq!(id.get(&[1, 2]), Complex64::ZERO);

        let ket = DataTensor::basis_state(3, &[0, 2]);
        assert_eq!(ket.get(&[0, 2]), Complex64::ONE);
        assert_approx_eq!(f64, ket.norm_squared(), 1.0);
    }

    #[test]
    fn inner_conjugates_left() {
        let a = DataTensor::new_from_flat(&[2], vec![Complex64::I, Complex64::ONE]);
        assert_approx_eq!(f64, a.inner(&a).re, 2.0);
        assert_approx_eq!(f64, a.inner(&a).im, 0.0);
    }

    #[test]
    #[should_panic(expected = "assertion failed: `(left approx_eq right)`")]
    fn approx_eq_different_shapes() {
        let a = DataTensor::zeros(&[2, 2]);
        let b = DataTensor::zeros(&[4]);
        assert_approx_eq!(&DataTensor, &a, &b);
    }
}
