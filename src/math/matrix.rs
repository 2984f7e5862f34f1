use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::{Add, Sub, Mul};

/// Dense row-major matrix. Rows are samples (nodes), columns are features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Builds a matrix from rows. An empty `data` yields a 0×0 matrix; use
    /// `Matrix::zeros(0, cols)` when the column count must survive.
    ///
    /// # Panics
    /// Panics if the rows are ragged.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let cols = data.first().map_or(0, |r| r.len());
        assert!(
            data.iter().all(|r| r.len() == cols),
            "Matrix rows must all have {} columns",
            cols
        );
        Matrix { rows: data.len(), cols, data }
    }

    /// A single-column matrix holding `values`.
    pub fn column(values: &[f64]) -> Matrix {
        Matrix::from_data(values.iter().map(|&v| vec![v]).collect())
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / rows)).
    ///
    /// Shape: (rows, cols). Weights multiply from the right (`x · W`), so
    /// `rows` is the fan-in.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        let std_dev = (1.0 / rows.max(1) as f64).sqrt();
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for x in row.iter_mut() {
                *x = Matrix::sample_standard_normal(rng) * std_dev;
            }
        }
        res
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor)
    }

    /// `self · rhs` without consuming either operand.
    pub fn matmul(&self, rhs: &Matrix) -> Matrix {
        if self.cols != rhs.rows {
            panic!(
                "Cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for (i, lhs_row) in self.data.iter().enumerate() {
            let out = &mut res.data[i];
            for (k, &a) in lhs_row.iter().enumerate() {
                for (o, &b) in out.iter_mut().zip(rhs.data[k].iter()) {
                    *o += a * b;
                }
            }
        }
        res
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, rhs: &Matrix) -> Matrix {
        self.assert_same_shape(rhs);
        let data = self.data.iter().zip(rhs.data.iter())
            .map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| x * y).collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }

    /// Adds the 1×cols matrix `row` to every row.
    pub fn add_row(&self, row: &Matrix) -> Matrix {
        assert_eq!(row.rows, 1, "broadcast operand must be a single row");
        assert_eq!(row.cols, self.cols, "broadcast operand has the wrong width");
        let data = self.data.iter()
            .map(|r| r.iter().zip(row.data[0].iter()).map(|(x, b)| x + b).collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }

    /// Sums every column, producing a 1×cols matrix.
    pub fn column_sums(&self) -> Matrix {
        let mut sums = vec![0.0; self.cols];
        for row in &self.data {
            for (s, x) in sums.iter_mut().zip(row.iter()) {
                *s += x;
            }
        }
        Matrix { rows: 1, cols: self.cols, data: vec![sums] }
    }

    /// Places `rhs` to the right of `self`; both must have the same row count.
    pub fn hconcat(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.rows, rhs.rows, "hconcat needs equal row counts");
        let data = self.data.iter().zip(rhs.data.iter())
            .map(|(a, b)| a.iter().chain(b.iter()).copied().collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols + rhs.cols, data }
    }

    /// Stacks matrices of equal width on top of each other.
    pub fn vstack(parts: &[Matrix], cols: usize) -> Matrix {
        let mut data = Vec::with_capacity(parts.iter().map(|m| m.rows).sum());
        for part in parts {
            assert_eq!(part.cols, cols, "vstack needs equal column counts");
            data.extend(part.data.iter().cloned());
        }
        Matrix { rows: data.len(), cols, data }
    }

    /// `len` rows starting at `start`.
    pub fn slice_rows(&self, start: usize, len: usize) -> Matrix {
        Matrix {
            rows: len,
            cols: self.cols,
            data: self.data[start..start + len].to_vec(),
        }
    }

    /// `len` columns starting at `start`.
    pub fn slice_cols(&self, start: usize, len: usize) -> Matrix {
        Matrix {
            rows: self.rows,
            cols: len,
            data: self.data.iter().map(|r| r[start..start + len].to_vec()).collect(),
        }
    }

    /// Frobenius (L2) norm over all entries.
    pub fn norm(&self) -> f64 {
        self.data.iter().flatten().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// Rescales the matrix so its norm is at most `max_norm`.
    pub fn clip_by_norm(&self, max_norm: f64) -> Matrix {
        let norm = self.norm();
        if norm > max_norm && norm > 0.0 {
            self.scale(max_norm / norm)
        } else {
            self.clone()
        }
    }

    fn assert_same_shape(&self, rhs: &Matrix) {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!(
                "Matrices are of incorrect sizes: {}x{} vs {}x{}",
                self.rows, self.cols, rhs.rows, rhs.cols
            )
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Add for Matrix {
    type Output = Matrix;

    fn add(self, rhs: Self) -> Self::Output {
        self.assert_same_shape(&rhs);
        let data = self.data.into_iter().zip(rhs.data)
            .map(|(a, b)| a.into_iter().zip(b).map(|(x, y)| x + y).collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }
}

impl Sub for Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        self.assert_same_shape(&rhs);
        let data = self.data.into_iter().zip(rhs.data)
            .map(|(a, b)| a.into_iter().zip(b).map(|(x, y)| x - y).collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        self.matmul(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn matmul_matches_hand_computation() {
        let a = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_data(vec![vec![5.0], vec![6.0]]);
        assert_eq!(a * b, Matrix::from_data(vec![vec![17.0], vec![39.0]]));
    }

    #[test]
    fn clip_by_norm_rescales_only_large_matrices() {
        let g = Matrix::from_data(vec![vec![3.0, 4.0]]);
        let clipped = g.clip_by_norm(1.0);
        assert!((clipped.norm() - 1.0).abs() < 1e-12);
        assert!((clipped.data[0][0] - 0.6).abs() < 1e-12);

        let small = Matrix::from_data(vec![vec![0.3, 0.4]]);
        assert_eq!(small.clip_by_norm(1.0), small);
    }

    #[test]
    fn hconcat_and_column_sums() {
        let a = Matrix::from_data(vec![vec![1.0], vec![2.0]]);
        let b = Matrix::from_data(vec![vec![3.0, 4.0], vec![5.0, 6.0]]);
        let c = a.hconcat(&b);
        assert_eq!(c.cols, 3);
        assert_eq!(c.column_sums().data[0], vec![3.0, 7.0, 10.0]);
    }

    #[test]
    fn vstack_keeps_width_for_empty_parts() {
        let stacked = Matrix::vstack(&[Matrix::zeros(0, 3), Matrix::zeros(2, 3)], 3);
        assert_eq!((stacked.rows, stacked.cols), (2, 3));
    }

    #[test]
    fn xavier_is_reproducible_with_seeded_rng() {
        let a = Matrix::xavier(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::xavier(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn matmul_propagates_non_finite_values_through_zero_entries() {
        let a = Matrix::from_data(vec![vec![0.0, 1.0]]);
        let b = Matrix::from_data(vec![vec![f64::NAN], vec![2.0]]);
        assert!(a.matmul(&b).data[0][0].is_nan());

        let c = Matrix::from_data(vec![vec![f64::INFINITY], vec![2.0]]);
        assert!(a.matmul(&c).data[0][0].is_nan());
    }

    #[test]
    fn slices_undo_hconcat_and_vstack() {
        let a = Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = Matrix::from_data(vec![vec![5.0], vec![6.0]]);
        let joined = a.hconcat(&b);
        assert_eq!(joined.slice_cols(0, 2), a);
        assert_eq!(joined.slice_cols(2, 1), b);

        let stacked = Matrix::vstack(&[a.clone(), joined.slice_cols(0, 2)], 2);
        assert_eq!(stacked.slice_rows(2, 2), a);
        assert_eq!(stacked.slice_rows(1, 0), Matrix::zeros(0, 2));
    }
}
