//! Small dense square matrices for assignment-matrix queries.
//!
//! Everything here operates on 2^k x 2^k matrices where k is the size of a
//! queried qubit subset, so plain row-major `Vec<f64>` storage is enough.
//! Columns are prepared states, rows are measured states:
//! `m[(measured, prepared)] = P(measured | prepared)`.

use serde::{Deserialize, Serialize};

use crate::error::{MitigationError, Result};

/// Maximum Mercator-series terms for the matrix logarithm.
const LOG_MAX_TERMS: usize = 200;
/// Convergence tolerance for the matrix logarithm (infinity norm of a term).
const LOG_TOLERANCE: f64 = 1e-12;

/// Dense square matrix, row-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    dim: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Zero matrix of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    /// Identity matrix.
    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Dimension (the matrix is `dim x dim`).
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Entry at (row, col).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }

    /// Set the entry at (row, col).
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.dim + col] = value;
    }

    /// Add to the entry at (row, col).
    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.dim + col] += value;
    }

    /// Raw row-major entries.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Matrix product `self * other`.
    pub fn mul(&self, other: &Matrix) -> Matrix {
        debug_assert_eq!(self.dim, other.dim);
        let dim = self.dim;
        let mut out = Matrix::zeros(dim);
        for i in 0..dim {
            for k in 0..dim {
                let a = self.get(i, k);
                if a == 0.0 {
                    continue;
                }
                for j in 0..dim {
                    out.add(i, j, a * other.get(k, j));
                }
            }
        }
        out
    }

    /// Matrix-vector product `self * v`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(self.dim, v.len());
        let mut out = vec![0.0; self.dim];
        for (i, out_i) in out.iter_mut().enumerate() {
            for (j, v_j) in v.iter().enumerate() {
                *out_i += self.get(i, j) * v_j;
            }
        }
        out
    }

    /// Sum of each column.
    pub fn column_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.dim];
        for i in 0..self.dim {
            for (j, sum) in sums.iter_mut().enumerate() {
                *sum += self.get(i, j);
            }
        }
        sums
    }

    /// Mean of the diagonal entries.
    pub fn mean_diagonal(&self) -> f64 {
        (0..self.dim).map(|i| self.get(i, i)).sum::<f64>() / self.dim as f64
    }

    /// True when every column sums to 1 within `tol` and every entry lies in
    /// `[-tol, 1 + tol]`.
    pub fn is_stochastic(&self, tol: f64) -> bool {
        self.column_sums().iter().all(|s| (s - 1.0).abs() <= tol)
            && self.data.iter().all(|&x| (-tol..=1.0 + tol).contains(&x))
    }

    /// Largest absolute entry.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0f64, |acc, x| acc.max(x.abs()))
    }

    /// Infinity norm (max absolute row sum).
    pub fn norm_inf(&self) -> f64 {
        (0..self.dim)
            .map(|i| (0..self.dim).map(|j| self.get(i, j).abs()).sum::<f64>())
            .fold(0.0f64, f64::max)
    }

    /// Gauss-Jordan inverse with partial pivoting.
    ///
    /// Near-singular pivots are skipped rather than failing; assignment
    /// matrices are diagonally dominant in practice so this is best-effort
    /// robustness, not a correctness path.
    pub fn inverse(&self) -> Matrix {
        let dim = self.dim;
        let mut aug = self.clone();
        let mut inv = Matrix::identity(dim);

        for col in 0..dim {
            let mut pivot_row = col;
            for row in (col + 1)..dim {
                if aug.get(row, col).abs() > aug.get(pivot_row, col).abs() {
                    pivot_row = row;
                }
            }
            if pivot_row != col {
                aug.swap_rows(col, pivot_row);
                inv.swap_rows(col, pivot_row);
            }

            let pivot = aug.get(col, col);
            if pivot.abs() < 1e-15 {
                continue;
            }
            for j in 0..dim {
                aug.set(col, j, aug.get(col, j) / pivot);
                inv.set(col, j, inv.get(col, j) / pivot);
            }
            for row in 0..dim {
                if row == col {
                    continue;
                }
                let factor = aug.get(row, col);
                if factor == 0.0 {
                    continue;
                }
                for j in 0..dim {
                    aug.set(row, j, aug.get(row, j) - factor * aug.get(col, j));
                    inv.set(row, j, inv.get(row, j) - factor * inv.get(col, j));
                }
            }
        }
        inv
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for j in 0..self.dim {
            let tmp = self.get(a, j);
            self.set(a, j, self.get(b, j));
            self.set(b, j, tmp);
        }
    }

    /// Matrix exponential via scaling-and-squaring with a Taylor series.
    ///
    /// Exact enough for generator matrices: columns of the input sum to zero,
    /// so columns of the result sum to one.
    pub fn expm(&self) -> Matrix {
        let norm = self.norm_inf();
        let squarings = if norm > 0.5 {
            (norm / 0.5).log2().ceil() as u32
        } else {
            0
        };
        let scale = 1.0 / f64::powi(2.0, squarings as i32);

        let mut scaled = self.clone();
        for x in &mut scaled.data {
            *x *= scale;
        }

        let mut sum = Matrix::identity(self.dim);
        let mut term = Matrix::identity(self.dim);
        for k in 1..=40 {
            term = term.mul(&scaled);
            for x in &mut term.data {
                *x /= k as f64;
            }
            for (s, t) in sum.data.iter_mut().zip(term.data.iter()) {
                *s += t;
            }
            if term.max_abs() < 1e-16 {
                break;
            }
        }

        let mut result = sum;
        for _ in 0..squarings {
            result = result.mul(&result);
        }
        result
    }

    /// Principal matrix logarithm via the Mercator series
    /// `log(A) = Σ_{k≥1} (-1)^{k+1} (A - I)^k / k`.
    ///
    /// Converges for assignment matrices close to the identity. Fails with
    /// [`MitigationError::FitConvergence`] (carrying the achieved residual)
    /// when the series has not dropped below tolerance within the term
    /// budget — the signal that readout error is too large for the
    /// generator-basis fit.
    pub fn logm(&self) -> Result<Matrix> {
        let dim = self.dim;
        let mut x = self.clone();
        for i in 0..dim {
            x.add(i, i, -1.0);
        }

        let mut sum = x.clone();
        let mut power = x.clone();
        let mut residual = x.norm_inf();
        for k in 2..=LOG_MAX_TERMS {
            power = power.mul(&x);
            let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
            let coeff = sign / k as f64;
            let mut term_norm = 0.0f64;
            for (s, p) in sum.data.iter_mut().zip(power.data.iter()) {
                let t = coeff * p;
                *s += t;
                term_norm = term_norm.max(t.abs());
            }
            residual = term_norm;
            if term_norm < LOG_TOLERANCE {
                return Ok(sum);
            }
        }
        Err(MitigationError::FitConvergence {
            residual,
            iterations: LOG_MAX_TERMS,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
