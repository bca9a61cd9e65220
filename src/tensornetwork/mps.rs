//! Matrix product states with SVD-based truncation.
//!
//! The state of `n` qudits is stored as a chain of site tensors of shape
//! `[left, d, right]`, with trivial (size 1) outer bonds:
//!
//! ```text
//!  A[0] --- A[1] --- ... --- A[n-1]
//!   |        |                 |
//! ```
//!
//! Operators are applied gate by gate. An operator on qudits `q_1..q_k` merges
//! the contiguous sites `min(q)..=max(q)` into a single block, is contracted
//! into the block (acting as identity on the sites in between) and the block is
//! split back into sites by successive truncated SVDs from left to right. No
//! swaps are inserted, so the gate order is never changed, but an operator
//! spanning `s` sites costs `O(d^s)` memory for the block.
//!
//! The chain is kept in mixed canonical form around an orthogonality center:
//! sites left of it are left-orthogonal, sites right of it right-orthogonal.
//! Before a block is merged the center is moved into it, so the singular values
//! of the block are the Schmidt values of the whole state at each cut.
use std::iter::zip;

use faer::{c64, Mat};
use itertools::{Itertools, MinMaxResult};
use log::{debug, trace, warn};
use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::{
    error::{SimulationError, SimulationResult},
    tensornetwork::{operator::Operator, statevector::Statevector, tensordata::DataTensor},
};

/// Controls how singular values are discarded when a block is split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncationPolicy {
    /// Largest fraction of the squared singular values that may be discarded at
    /// a single cut.
    pub eps: f64,
    /// Upper bound on every bond dimension.
    pub max_bond_dim: Option<usize>,
}

impl TruncationPolicy {
    /// Only singular values at round-off level are discarded.
    #[must_use]
    pub fn exact() -> Self {
        Self {
            eps: 0.0,
            max_bond_dim: None,
        }
    }

    /// Checks that the tolerance is a non-negative number and the cap, if any,
    /// is at least 1.
    pub fn validate(&self) -> SimulationResult<()> {
        if self.eps.is_nan() || self.eps < 0.0 {
            return Err(SimulationError::InvalidTolerance(self.eps));
        }
        if self.max_bond_dim == Some(0) {
            return Err(SimulationError::DimensionMismatch(String::from(
                "the maximum bond dimension must be at least 1",
            )));
        }
        Ok(())
    }
}

/// Why a block could not be split back into sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    /// Meeting the tolerance on `bond` would need `required` singular values,
    /// more than the `cap` allows.
    Overflow {
        bond: usize,
        required: usize,
        cap: usize,
    },
    /// The SVD of the block at `bond` failed or does not reproduce the block.
    Decomposition { bond: usize },
}

impl SplitError {
    /// Attaches the location of the failing operation.
    pub(crate) fn at(self, location: impl Into<String>) -> SimulationError {
        match self {
            Self::Overflow {
                bond,
                required,
                cap,
            } => SimulationError::TruncationCapExceeded {
                location: location.into(),
                bond,
                required,
                cap,
            },
            Self::Decomposition { bond } => SimulationError::DecompositionFailed {
                location: location.into(),
                bond,
            },
        }
    }
}

/// Which factor of a split receives the singular values.
#[derive(Debug, Clone, Copy)]
enum Absorb {
    Left,
    Right,
}

/// A truncated SVD `M ~ left * right`.
struct Factorization {
    left: DMatrix<Complex64>,
    right: DMatrix<Complex64>,
    /// Discarded weight relative to the total weight.
    discarded: f64,
}

/// Relative weight below which singular values count as round-off, so that an
/// exact split does not keep numerically zero bonds.
const ROUNDOFF_WEIGHT: f64 = 1e-24;

/// Returns how many of the descending `weights` to keep so that the discarded
/// tail is at most `eps` of the total, together with the discarded weight. At
/// least one value is always kept.
fn truncation_rank(weights: &[f64], eps: f64) -> (usize, f64) {
    let total: f64 = weights.iter().sum();
    let budget = (eps + ROUNDOFF_WEIGHT) * total;
    let mut rank = weights.len();
    let mut discarded = 0.0;
    while rank > 1 && discarded + weights[rank - 1] <= budget {
        discarded += weights[rank - 1];
        rank -= 1;
    }
    (rank, discarded)
}

/// Largest relative Frobenius residual accepted from an SVD.
const RECONSTRUCTION_TOLERANCE: f64 = 1e-10;

/// Thin SVD `M = U diag(s) V^H` computed by faer, with `V^H` returned as the
/// right factor.
fn thin_svd(
    matrix: &DMatrix<Complex64>,
) -> Option<(DMatrix<Complex64>, Vec<f64>, DMatrix<Complex64>)> {
    let mat = Mat::from_fn(matrix.nrows(), matrix.ncols(), |i, j| {
        let z = matrix[(i, j)];
        c64::new(z.re, z.im)
    });
    let svd = mat.thin_svd().ok()?;
    let (u, s, v) = (svd.U(), svd.S().column_vector(), svd.V());
    let rank = s.nrows();

    let left = DMatrix::from_fn(u.nrows(), rank, |i, j| {
        let z = u[(i, j)];
        Complex64::new(z.re, z.im)
    });
    let values = (0..rank).map(|j| s[j].re).collect_vec();
    let right = DMatrix::from_fn(rank, v.nrows(), |i, j| {
        let z = v[(j, i)];
        Complex64::new(z.re, -z.im)
    });
    Some((left, values, right))
}

/// Returns `left * diag(values) * right`.
fn recompose(
    left: &DMatrix<Complex64>,
    values: &[f64],
    right: &DMatrix<Complex64>,
) -> DMatrix<Complex64> {
    let mut scaled = left.clone();
    for (j, &value) in values.iter().enumerate() {
        let mut column = scaled.column_mut(j);
        column *= Complex64::new(value, 0.0);
    }
    scaled * right
}

/// Splits `matrix` by a truncated SVD. The kept singular values are rescaled so
/// that the norm of the matrix is preserved.
fn factorize(
    matrix: DMatrix<Complex64>,
    policy: &TruncationPolicy,
    bond: usize,
    absorb: Absorb,
) -> Result<Factorization, SplitError> {
    let (u, values, v_t) = thin_svd(&matrix).ok_or(SplitError::Decomposition { bond })?;
    let residual = (recompose(&u, &values, &v_t) - &matrix).norm();
    if residual.is_nan() || residual > RECONSTRUCTION_TOLERANCE * matrix.norm() {
        warn!(bond, residual; "SVD does not reproduce the block");
        return Err(SplitError::Decomposition { bond });
    }

    let order = (0..values.len())
        .sorted_by(|&a, &b| values[b].total_cmp(&values[a]))
        .collect_vec();
    let weights = order.iter().map(|&i| values[i].powi(2)).collect_vec();

    let (rank, discarded) = truncation_rank(&weights, policy.eps);
    if let Some(cap) = policy.max_bond_dim {
        if rank > cap {
            return Err(SplitError::Overflow {
                bond,
                required: rank,
                cap,
            });
        }
    }

    let total: f64 = weights.iter().sum();
    let rescale = if discarded > 0.0 {
        (total / (total - discarded)).sqrt()
    } else {
        1.0
    };

    let kept = &order[..rank];
    let mut left = u.select_columns(kept);
    let mut right = v_t.select_rows(kept);
    for (j, &i) in kept.iter().enumerate() {
        let value = Complex64::new(values[i] * rescale, 0.0);
        match absorb {
            Absorb::Left => {
                let mut column = left.column_mut(j);
                column *= value;
            }
            Absorb::Right => {
                let mut row = right.row_mut(j);
                row *= value;
            }
        }
    }

    Ok(Factorization {
        left,
        right,
        discarded: if total > 0.0 { discarded / total } else { 0.0 },
    })
}

/// A matrix product state over qudits of a common local dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct MpsState {
    /// Site tensors with axes `[left bond, physical, right bond]`.
    sites: Vec<DataTensor>,
    dim: usize,
    /// Sum of the relative discarded weights of all truncations so far.
    truncation_error: f64,
    /// Orthogonality center.
    center: usize,
}

impl MpsState {
    /// The all-zero basis state with bond dimension 1 everywhere. A chain needs
    /// at least one site.
    pub fn zero_state(qudits: usize, dim: usize) -> SimulationResult<Self> {
        if qudits == 0 {
            return Err(SimulationError::EmptySystem);
        }
        let site = DataTensor::basis_state(dim, &[0]).reshape(&[1, dim, 1]);
        Ok(Self {
            sites: vec![site; qudits],
            dim,
            truncation_error: 0.0,
            center: 0,
        })
    }

    #[inline]
    pub fn num_qudits(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the site tensors, each of shape `[left, d, right]`.
    #[inline]
    pub fn sites(&self) -> &[DataTensor] {
        &self.sites
    }

    /// Returns the dimension of each of the `n - 1` inner bonds.
    pub fn bond_dims(&self) -> Vec<usize> {
        self.sites[..self.sites.len() - 1]
            .iter()
            .map(|site| site.shape()[2])
            .collect()
    }

    /// Returns the largest inner bond dimension, 1 for a single qudit.
    pub fn max_bond_dim(&self) -> usize {
        self.bond_dims().into_iter().max().unwrap_or(1)
    }

    /// Returns the accumulated relative discarded weight. It never decreases.
    #[inline]
    pub fn truncation_error(&self) -> f64 {
        self.truncation_error
    }

    fn record_truncation(&mut self, bond: usize, discarded: f64) {
        if discarded > 0.0 {
            self.truncation_error += discarded;
            debug!(bond, discarded, total = self.truncation_error; "Truncated bond");
        }
    }

    /// Applies an operator whose qudits are valid for this state.
    pub fn apply_operator(
        &mut self,
        op: &Operator,
        policy: &TruncationPolicy,
    ) -> Result<(), SplitError> {
        let (start, end) = match op.qudits().iter().minmax() {
            MinMaxResult::OneElement(&q) => (q, q),
            MinMaxResult::MinMax(&lo, &hi) => (lo, hi),
            MinMaxResult::NoElements => unreachable!("operators act on at least one qudit"),
        };

        self.move_center(start);
        if start == end {
            self.sites[start] = op.apply(&self.sites[start], &[1]);
            return Ok(());
        }

        trace!(start, end; "Merging sites");
        let block = self.merge(start, end);
        let axes = op.qudits().iter().map(|q| q - start + 1).collect_vec();
        let block = op.apply(&block, &axes);
        self.split(block, start, end, policy)
    }

    /// Contracts the sites `start..=end` into one tensor of shape
    /// `[left, d, ..., d, right]`.
    fn merge(&self, start: usize, end: usize) -> DataTensor {
        self.sites[start + 1..=end]
            .iter()
            .fold(self.sites[start].clone(), |block, site| {
                block.tensordot(&[block.ndim() - 1], site, &[0])
            })
    }

    /// Splits a block of shape `[left, d, ..., d, right]` back into the sites
    /// `start..=end`.
    fn split(
        &mut self,
        block: DataTensor,
        start: usize,
        end: usize,
        policy: &TruncationPolicy,
    ) -> Result<(), SplitError> {
        let mut rest = block;
        for site in start..end {
            let left_dim = rest.shape()[0];
            let tail = rest.shape()[2..].to_vec();
            let factorization = factorize(
                rest.to_matrix(left_dim * self.dim),
                policy,
                site,
                Absorb::Right,
            )?;
            self.record_truncation(site, factorization.discarded);

            let rank = factorization.left.ncols();
            self.sites[site] =
                DataTensor::from_matrix(&factorization.left, &[left_dim, self.dim, rank]);
            let shape = std::iter::once(rank).chain(tail).collect_vec();
            rest = DataTensor::from_matrix(&factorization.right, &shape);
        }
        self.sites[end] = rest;
        self.center = end;
        Ok(())
    }

    /// Moves the orthogonality center to `site` by QR decompositions of the
    /// sites in between.
    fn move_center(&mut self, site: usize) {
        while self.center < site {
            let c = self.center;
            let shape = self.sites[c].shape().to_vec();
            let qr = self.sites[c].to_matrix(shape[0] * shape[1]).qr();
            let (q, r) = (qr.q(), qr.r());
            let rank = q.ncols();
            self.sites[c] = DataTensor::from_matrix(&q, &[shape[0], shape[1], rank]);
            let carry = DataTensor::from_matrix(&r, &[rank, shape[2]]);
            self.sites[c + 1] = carry.tensordot(&[1], &self.sites[c + 1], &[0]);
            self.center += 1;
        }
        while self.center > site {
            let c = self.center;
            let shape = self.sites[c].shape().to_vec();
            // LQ decomposition from the QR decomposition of the adjoint
            let qr = self.sites[c].to_matrix(shape[0]).adjoint().qr();
            let (q, l) = (qr.q().adjoint(), qr.r().adjoint());
            let rank = q.nrows();
            self.sites[c] = DataTensor::from_matrix(&q, &[rank, shape[1], shape[2]]);
            let carry = DataTensor::from_matrix(&l, &[shape[0], rank]);
            self.sites[c - 1] = self.sites[c - 1].tensordot(&[2], &carry, &[0]);
            self.center -= 1;
        }
    }

    /// Returns the amplitude of the given basis state by sweeping from the left
    /// boundary to the right one.
    #[must_use]
    pub fn amplitude(&self, levels: &[usize]) -> Complex64 {
        assert_eq!(levels.len(), self.num_qudits(), "Basis state has wrong length");
        let mut boundary = vec![Complex64::ONE];
        for (site, &level) in zip(&self.sites, levels) {
            let (left, right) = (site.shape()[0], site.shape()[2]);
            let data = site.elements();
            boundary = (0..right)
                .map(|r| {
                    (0..left)
                        .map(|l| boundary[l] * data[(l * self.dim + level) * right + r])
                        .sum()
                })
                .collect();
        }
        boundary[0]
    }

    /// Returns `<self|other>` by contracting the transfer matrices of both
    /// chains from left to right.
    #[must_use]
    pub fn inner(&self, other: &Self) -> Complex64 {
        assert_eq!(
            self.num_qudits(),
            other.num_qudits(),
            "Overlap of states with different numbers of qudits"
        );
        let mut environment = DataTensor::new_from_flat(&[1, 1], vec![Complex64::ONE]);
        for (bra, ket) in zip(&self.sites, &other.sites) {
            let mut bra = bra.clone();
            bra.conjugate();
            // [ket left, physical, bra right]
            let partial = environment.tensordot(&[0], &bra, &[0]);
            environment = partial.tensordot(&[0, 1], ket, &[0, 1]);
        }
        environment.get(&[0, 0])
    }

    #[must_use]
    pub fn norm_squared(&self) -> f64 {
        self.inner(self).re
    }

    /// Returns `<self|op|self>`, applying `op` to a copy of the chain.
    pub fn expected(
        &self,
        op: &Operator,
        policy: &TruncationPolicy,
    ) -> Result<Complex64, SplitError> {
        let mut applied = self.clone();
        applied.apply_operator(op, policy)?;
        Ok(self.inner(&applied))
    }

    /// Contracts the whole chain into a dense statevector.
    #[must_use]
    pub fn to_statevector(&self) -> Statevector {
        let block = self.merge(0, self.num_qudits() - 1);
        Statevector::from_tensor(block.reshape(&vec![self.dim; self.num_qudits()]))
    }

    /// Recompresses the whole chain.
    ///
    /// The chain is first brought into left-orthogonal form, then truncated
    /// from right to left. With all sites to the left of a cut orthogonal, the
    /// discarded weight at each cut is exact. The discarded weight is added to
    /// the truncation error.
    pub fn compress(&self, policy: &TruncationPolicy) -> Result<Self, SplitError> {
        let mut out = self.clone();
        let n = out.num_qudits();
        out.move_center(n - 1);

        for site in (1..n).rev() {
            let shape = out.sites[site].shape().to_vec();
            let factorization = factorize(
                out.sites[site].to_matrix(shape[0]),
                policy,
                site - 1,
                Absorb::Left,
            )?;
            out.record_truncation(site - 1, factorization.discarded);

            let rank = factorization.right.nrows();
            out.sites[site] =
                DataTensor::from_matrix(&factorization.right, &[rank, shape[1], shape[2]]);
            let carry = DataTensor::from_matrix(&factorization.left, &[shape[0], rank]);
            out.sites[site - 1] = out.sites[site - 1].tensordot(&[2], &carry, &[0]);
            out.center = site - 1;
        }

        debug!(bonds:? = out.bond_dims(), error = out.truncation_error; "Recompressed chain");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f64::consts::FRAC_1_SQRT_2;

    use float_cmp::assert_approx_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{
        builders::{connectivity::ConnectivityLayout, random_circuit::random_circuit},
        gates::{controlled_shift, fourier, load_gate},
    };

    fn op(name: &str, angles: &[f64], qudits: Vec<usize>) -> Operator {
        Operator::new(load_gate(name, angles).unwrap(), qudits).unwrap()
    }

    fn policy(eps: f64) -> TruncationPolicy {
        TruncationPolicy {
            eps,
            max_bond_dim: None,
        }
    }

    fn assert_matches_statevector(mps: &MpsState, reference: &Statevector) {
        assert_approx_eq!(
            &DataTensor,
            mps.to_statevector().tensor(),
            reference.tensor(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn truncation_rank_keeps_at_least_one() {
        assert_eq!(truncation_rank(&[0.5, 0.5], 1.0), (1, 0.5));
        assert_eq!(truncation_rank(&[1.0, 0.0, 0.0], 0.0), (1, 0.0));
        assert_eq!(truncation_rank(&[0.9, 0.1], 0.05), (2, 0.0));
        assert_eq!(truncation_rank(&[1.0, 1e-30], 0.0), (1, 1e-30));
        let (rank, discarded) = truncation_rank(&[0.7, 0.2, 0.06, 0.04], 0.11);
        assert_eq!(rank, 2);
        assert_approx_eq!(f64, discarded, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn factorize_reproduces_rank_deficient_block() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut random = |rows, cols| {
            DMatrix::from_fn(rows, cols, |_, _| {
                Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
            })
        };
        // rank 2 block of the shape produced by merging two distant qubits
        let block = random(4, 2) * random(2, 16);
        for absorb in [Absorb::Left, Absorb::Right] {
            let split = factorize(block.clone(), &policy(0.0), 0, absorb).unwrap();
            assert_eq!(split.left.ncols(), 2);
            let residual = (&split.left * &split.right - &block).norm();
            assert!(residual < 1e-10 * block.norm(), "residual {residual}");
            assert_approx_eq!(f64, split.discarded, 0.0, epsilon = 1e-20);
        }
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert_eq!(
            MpsState::zero_state(0, 2).unwrap_err(),
            SimulationError::EmptySystem
        );
    }

    #[test]
    fn truncation_error_never_decreases() {
        let mut rng = StdRng::seed_from_u64(5);
        let circuit =
            random_circuit(5, 4, 0.8, 0.8, &mut rng, ConnectivityLayout::All(5)).unwrap();
        let mut mps = MpsState::zero_state(5, 2).unwrap();
        let mut previous = mps.truncation_error();
        for gate in circuit.operators() {
            mps.apply_operator(gate, &policy(0.02)).unwrap();
            assert!(mps.truncation_error() >= previous);
            previous = mps.truncation_error();
        }
        let compressed = mps.compress(&policy(0.02)).unwrap();
        assert!(compressed.truncation_error() >= previous);
    }

    #[test]
    fn zero_state() {
        let mps = MpsState::zero_state(4, 2).unwrap();
        assert_eq!(mps.num_qudits(), 4);
        assert_eq!(mps.bond_dims(), vec![1, 1, 1]);
        assert_eq!(mps.amplitude(&[0, 0, 0, 0]), Complex64::ONE);
        assert_eq!(mps.amplitude(&[0, 1, 0, 0]), Complex64::ZERO);
        assert_approx_eq!(f64, mps.norm_squared(), 1.0);
    }

    #[test]
    fn bell_state() {
        let mut mps = MpsState::zero_state(2, 2).unwrap();
        mps.apply_operator(&op("h", &[], vec![0]), &policy(0.0)).unwrap();
        mps.apply_operator(&op("cx", &[], vec![0, 1]), &policy(0.0)).unwrap();
        assert_eq!(mps.bond_dims(), vec![2]);
        assert_approx_eq!(f64, mps.amplitude(&[0, 0]).re, FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.amplitude(&[1, 1]).re, FRAC_1_SQRT_2, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.amplitude(&[0, 1]).norm(), 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.amplitude(&[1, 0]).norm(), 0.0, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.truncation_error(), 0.0);
    }

    #[test]
    fn non_adjacent_operator() {
        let gates = [
            op("h", &[], vec![0]),
            op("ry", &[0.7], vec![1]),
            op("cx", &[], vec![0, 3]),
            op("fsim", &[0.3, 0.2], vec![3, 1]),
            op("cz", &[], vec![2, 0]),
        ];
        let mut mps = MpsState::zero_state(4, 2).unwrap();
        let mut reference = Statevector::zero_state(4, 2);
        for gate in &gates {
            mps.apply_operator(gate, &policy(0.0)).unwrap();
            reference.apply_operator(gate);
        }
        assert_matches_statevector(&mps, &reference);
        assert_approx_eq!(f64, mps.norm_squared(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn truncation_preserves_norm() {
        let gates = [
            op("h", &[], vec![0]),
            op("h", &[], vec![1]),
            op("h", &[], vec![2]),
            op("cx", &[], vec![0, 3]),
            op("fsim", &[0.3, 0.2], vec![1, 2]),
            op("ry", &[0.4], vec![3]),
            op("cx", &[], vec![2, 0]),
            op("cx", &[], vec![3, 1]),
            op("fsim", &[1.1, 0.7], vec![0, 1]),
        ];
        let mut mps = MpsState::zero_state(4, 2).unwrap();
        for gate in &gates {
            mps.apply_operator(gate, &policy(0.05)).unwrap();
            assert_approx_eq!(f64, mps.norm_squared(), 1.0, epsilon = 1e-10);
        }
        assert!(mps.max_bond_dim() <= 4);
    }

    #[test]
    fn qutrit_chain() {
        let f = Operator::new(fourier(3), vec![0]).unwrap();
        let sum = Operator::new(controlled_shift(3), vec![0, 2]).unwrap();
        let mut mps = MpsState::zero_state(3, 3).unwrap();
        let mut reference = Statevector::zero_state(3, 3);
        for gate in [&f, &sum] {
            mps.apply_operator(gate, &policy(0.0)).unwrap();
            reference.apply_operator(gate);
        }
        assert_matches_statevector(&mps, &reference);
        assert_eq!(mps.bond_dims(), vec![3, 3]);
    }

    #[test]
    fn truncation_discards_small_schmidt_weight() {
        let theta: f64 = 0.6;
        let small = (theta / 2.0).sin().powi(2);
        let mut mps = MpsState::zero_state(2, 2).unwrap();
        mps.apply_operator(&op("ry", &[theta], vec![0]), &policy(0.1)).unwrap();
        mps.apply_operator(&op("cx", &[], vec![0, 1]), &policy(0.1)).unwrap();
        assert_eq!(mps.bond_dims(), vec![1]);
        assert_approx_eq!(f64, mps.truncation_error(), small, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.norm_squared(), 1.0, epsilon = 1e-12);
        assert_approx_eq!(f64, mps.amplitude(&[0, 0]).norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn bond_cap_is_reported() {
        let capped = TruncationPolicy {
            eps: 0.0,
            max_bond_dim: Some(1),
        };
        let mut mps = MpsState::zero_state(2, 2).unwrap();
        mps.apply_operator(&op("h", &[], vec![0]), &capped).unwrap();
        let overflow = mps.apply_operator(&op("cx", &[], vec![0, 1]), &capped).unwrap_err();
        assert_eq!(
            overflow,
            SplitError::Overflow {
                bond: 0,
                required: 2,
                cap: 1
            }
        );
    }

    #[test]
    fn expectation_values() {
        let mut mps = MpsState::zero_state(2, 2).unwrap();
        let z = op("z", &[], vec![1]);
        assert_approx_eq!(f64, mps.expected(&z, &policy(0.0)).unwrap().re, 1.0);
        mps.apply_operator(&op("x", &[], vec![1]), &policy(0.0)).unwrap();
        assert_approx_eq!(f64, mps.expected(&z, &policy(0.0)).unwrap().re, -1.0);
        let zz = Operator::new(
            op("z", &[], vec![0]).tensor().tensordot(&[], z.tensor(), &[]).transpose(&[0, 2, 1, 3]),
            vec![0, 1],
        )
        .unwrap();
        assert_approx_eq!(f64, mps.expected(&zz, &policy(0.0)).unwrap().re, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn compress_exact_keeps_state() {
        let mut mps = MpsState::zero_state(3, 2).unwrap();
        let mut reference = Statevector::zero_state(3, 2);
        for gate in [
            op("h", &[], vec![0]),
            op("cx", &[], vec![0, 1]),
            op("rx", &[0.4], vec![2]),
            op("cx", &[], vec![1, 2]),
        ] {
            mps.apply_operator(&gate, &policy(0.0)).unwrap();
            reference.apply_operator(&gate);
        }
        let compressed = mps.compress(&policy(0.0)).unwrap();
        assert_matches_statevector(&compressed, &reference);
        assert!(compressed.bond_dims().iter().all(|&d| d <= 2));
    }

    #[test]
    fn compress_truncates_ghz_branch() {
        let theta: f64 = 0.6;
        let small = (theta / 2.0).sin().powi(2);
        let mut mps = MpsState::zero_state(3, 2).unwrap();
        for gate in [
            op("ry", &[theta], vec![0]),
            op("cx", &[], vec![0, 1]),
            op("cx", &[], vec![1, 2]),
        ] {
            mps.apply_operator(&gate, &policy(0.0)).unwrap();
        }
        assert_eq!(mps.bond_dims(), vec![2, 2]);

        let compressed = mps.compress(&policy(0.1)).unwrap();
        assert_eq!(compressed.bond_dims(), vec![1, 1]);
        assert_approx_eq!(f64, compressed.truncation_error(), small, epsilon = 1e-10);
        assert_approx_eq!(f64, compressed.amplitude(&[0, 0, 0]).norm(), 1.0, epsilon = 1e-10);
        assert!(compressed.truncation_error() >= mps.truncation_error());
    }
}
