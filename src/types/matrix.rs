//! Dense row-major matrix used by the inverter, the Kalman predictor and the
//! least-squares fitters.
//!
//! Dimensions are fixed at construction. Every operation that writes a result
//! takes an already allocated destination and checks its shape first, so a
//! failed call never leaves a partially written matrix behind.

use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::error::MatrixError;

/// Dense `rows × cols` matrix of `f64`, stored row-major.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatrixRepr", into = "MatrixRepr")]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Wire form of a [`Matrix`]; validated on the way in.
#[derive(Serialize, Deserialize)]
struct MatrixRepr {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<MatrixRepr> for Matrix {
    type Error = MatrixError;

    fn try_from(repr: MatrixRepr) -> Result<Self, Self::Error> {
        Matrix::from_row_slice(repr.rows, repr.cols, &repr.data)
    }
}

impl From<Matrix> for MatrixRepr {
    fn from(m: Matrix) -> Self {
        MatrixRepr {
            rows: m.rows,
            cols: m.cols,
            data: m.data,
        }
    }
}

impl Matrix {
    /// Allocate a zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Result<Self, MatrixError> {
        let len = match rows.checked_mul(cols) {
            Some(len) if len > 0 => len,
            _ => return Err(MatrixError::InvalidShape { rows, cols }),
        };
        Ok(Self {
            rows,
            cols,
            data: vec![0.0; len],
        })
    }

    /// Allocate an `n × n` identity matrix.
    pub fn identity(n: usize) -> Result<Self, MatrixError> {
        let mut m = Self::zeros(n, n)?;
        for i in 0..n {
            m.data[i * n + i] = 1.0;
        }
        Ok(m)
    }

    /// Build a matrix from row-major values; `values.len()` must equal
    /// `rows * cols`.
    pub fn from_row_slice(rows: usize, cols: usize, values: &[f64]) -> Result<Self, MatrixError> {
        let mut m = Self::zeros(rows, cols)?;
        m.set_values(values)?;
        Ok(m)
    }

    /// Build a matrix from a 2D literal, one array per row.
    ///
    /// ```
    /// use track_matrix_rs::Matrix;
    /// let h = Matrix::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]).unwrap();
    /// assert_eq!(h.shape(), (2, 3));
    /// ```
    pub fn from_rows<const C: usize>(rows: &[[f64; C]]) -> Result<Self, MatrixError> {
        let mut m = Self::zeros(rows.len(), C)?;
        for (dst, src) in m.data.chunks_exact_mut(C).zip(rows) {
            dst.copy_from_slice(src);
        }
        Ok(m)
    }

    /// Build an `n × 1` column vector.
    pub fn column(values: &[f64]) -> Result<Self, MatrixError> {
        Self::from_row_slice(values.len(), 1, values)
    }

    /// Overwrite every element from row-major values.
    pub fn set_values(&mut self, values: &[f64]) -> Result<(), MatrixError> {
        if values.len() != self.data.len() {
            return Err(MatrixError::ValueCount {
                expected: self.data.len(),
                got: values.len(),
            });
        }
        self.data.copy_from_slice(values);
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    /// Row-major view of the elements.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Borrow row `r`. Panics if `r` is out of range, like slice indexing.
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            Some(self.data[row * self.cols + col])
        } else {
            None
        }
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> Result<f64, MatrixError> {
        self.require_square("trace")?;
        Ok((0..self.rows).map(|i| self.data[i * self.cols + i]).sum())
    }

    /// Overwrite `self` with `source`; shapes must match.
    pub fn copy_from(&mut self, source: &Matrix) -> Result<(), MatrixError> {
        if source.shape() != self.shape() {
            return Err(MatrixError::DimensionMismatch {
                op: "copy",
                expected: source.shape(),
                got: self.shape(),
            });
        }
        self.data.copy_from_slice(&source.data);
        Ok(())
    }

    /// Set the diagonal to 1 and everything else to 0.
    pub fn set_identity(&mut self) -> Result<(), MatrixError> {
        self.require_square("set_identity")?;
        let n = self.rows;
        for (idx, value) in self.data.iter_mut().enumerate() {
            *value = if idx / n == idx % n { 1.0 } else { 0.0 };
        }
        Ok(())
    }

    /// In place `self ← I − self`.
    pub fn subtract_from_identity(&mut self) -> Result<(), MatrixError> {
        self.require_square("subtract_from_identity")?;
        let n = self.rows;
        for (idx, value) in self.data.iter_mut().enumerate() {
            let diag = if idx / n == idx % n { 1.0 } else { 0.0 };
            *value = diag - *value;
        }
        Ok(())
    }

    /// Multiply every element by a non-zero scalar.
    pub fn scale(&mut self, scalar: f64) -> Result<(), MatrixError> {
        if scalar == 0.0 {
            return Err(MatrixError::ZeroScalar { op: "scale" });
        }
        self.data.iter_mut().for_each(|v| *v *= scalar);
        Ok(())
    }

    /// Exchange rows `r1` and `r2`.
    pub fn swap_rows(&mut self, r1: usize, r2: usize) -> Result<(), MatrixError> {
        self.require_row("swap_rows", r1)?;
        self.require_row("swap_rows", r2)?;
        if r1 == r2 {
            return Err(MatrixError::SameRow {
                op: "swap_rows",
                row: r1,
            });
        }
        let cols = self.cols;
        let (lo, hi) = (r1.min(r2), r1.max(r2));
        let (head, tail) = self.data.split_at_mut(hi * cols);
        head[lo * cols..(lo + 1) * cols].swap_with_slice(&mut tail[..cols]);
        Ok(())
    }

    /// Multiply row `r` by a non-zero scalar.
    pub fn scale_row(&mut self, r: usize, scalar: f64) -> Result<(), MatrixError> {
        self.require_row("scale_row", r)?;
        if scalar == 0.0 {
            return Err(MatrixError::ZeroScalar { op: "scale_row" });
        }
        let cols = self.cols;
        self.data[r * cols..(r + 1) * cols]
            .iter_mut()
            .for_each(|v| *v *= scalar);
        Ok(())
    }

    /// Add `scalar × row r2` to row `r1`.
    pub fn shear_row(&mut self, r1: usize, r2: usize, scalar: f64) -> Result<(), MatrixError> {
        self.require_row("shear_row", r1)?;
        self.require_row("shear_row", r2)?;
        if r1 == r2 {
            return Err(MatrixError::SameRow {
                op: "shear_row",
                row: r1,
            });
        }
        let cols = self.cols;
        for c in 0..cols {
            let source = self.data[r2 * cols + c];
            self.data[r1 * cols + c] += scalar * source;
        }
        Ok(())
    }

    pub(crate) fn require_square(&self, op: &'static str) -> Result<(), MatrixError> {
        if self.is_square() {
            Ok(())
        } else {
            Err(MatrixError::NotSquare {
                op,
                rows: self.rows,
                cols: self.cols,
            })
        }
    }

    pub(crate) fn require_shape(
        &self,
        op: &'static str,
        expected: (usize, usize),
    ) -> Result<(), MatrixError> {
        if self.shape() == expected {
            Ok(())
        } else {
            Err(MatrixError::DimensionMismatch {
                op,
                expected,
                got: self.shape(),
            })
        }
    }

    fn require_row(&self, op: &'static str, row: usize) -> Result<(), MatrixError> {
        if row < self.rows {
            Ok(())
        } else {
            Err(MatrixError::RowOutOfRange {
                op,
                row,
                rows: self.rows,
            })
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        assert!(row < self.rows, "row {} out of range for {} rows", row, self.rows);
        assert!(col < self.cols, "column {} out of range for {} columns", col, self.cols);
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        assert!(row < self.rows, "row {} out of range for {} rows", row, self.rows);
        assert!(col < self.cols, "column {} out of range for {} columns", col, self.cols);
        &mut self.data[row * self.cols + col]
    }
}

/// Fixed-width table, two decimals per entry, one row per line.
impl fmt::Display for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            for (c, value) in self.row(r).iter().enumerate() {
                if c > 0 {
                    write!(f, " ")?;
                }
                write!(f, "{:6.2}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeros_rejects_empty_shape() {
        assert_eq!(
            Matrix::zeros(0, 3),
            Err(MatrixError::InvalidShape { rows: 0, cols: 3 })
        );
        assert!(Matrix::zeros(2, 0).is_err());
        let m = Matrix::zeros(2, 3).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert!(m.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_zeros_rejects_overflowing_shape() {
        let huge = 1usize << (usize::BITS / 2);
        assert_eq!(
            Matrix::zeros(huge, huge),
            Err(MatrixError::InvalidShape { rows: huge, cols: huge })
        );
        assert!(Matrix::zeros(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_index_checks_row() {
        let m = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m[(1, 2)], 6.0);
        let result = std::panic::catch_unwind(|| m[(2, 0)]);
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "row 3 out of range for 3 rows")]
    fn test_index_mut_row_out_of_range() {
        // Flat offset 3 * 1 + 0 would still be inside the storage.
        let mut m = Matrix::zeros(3, 1).unwrap();
        m[(3, 0)] = 1.0;
    }

    #[test]
    fn test_from_row_slice_validates_count() {
        let err = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(err, MatrixError::ValueCount { expected: 4, got: 3 });

        let m = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(m.row(0), &[1.0, 2.0]);
    }

    #[test]
    fn test_from_rows_literal() {
        let m = Matrix::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.shape(), (2, 3));
        assert_eq!(m[(1, 2)], 6.0);

        let empty: [[f64; 3]; 0] = [];
        assert!(Matrix::from_rows(&empty).is_err());
    }

    #[test]
    fn test_identity_and_trace() {
        let m = Matrix::identity(3).unwrap();
        assert_eq!(m.trace().unwrap(), 3.0);
        assert_eq!(m[(0, 1)], 0.0);
        assert!(Matrix::zeros(2, 3).unwrap().trace().is_err());
    }

    #[test]
    fn test_set_identity_requires_square() {
        let mut m = Matrix::zeros(2, 3).unwrap();
        assert_eq!(
            m.set_identity(),
            Err(MatrixError::NotSquare {
                op: "set_identity",
                rows: 2,
                cols: 3
            })
        );

        let mut m = Matrix::from_rows(&[[5.0, 6.0], [7.0, 8.0]]).unwrap();
        m.set_identity().unwrap();
        assert_eq!(m, Matrix::identity(2).unwrap());
    }

    #[test]
    fn test_subtract_from_identity() {
        let mut m = Matrix::from_rows(&[[0.25, 0.5], [-1.0, 2.0]]).unwrap();
        m.subtract_from_identity().unwrap();
        assert_eq!(m.as_slice(), &[0.75, -0.5, 1.0, -1.0]);
    }

    #[test]
    fn test_scale_rejects_zero() {
        let mut m = Matrix::from_rows(&[[1.0, -2.0]]).unwrap();
        assert_eq!(m.scale(0.0), Err(MatrixError::ZeroScalar { op: "scale" }));
        m.scale(-3.0).unwrap();
        assert_eq!(m.as_slice(), &[-3.0, 6.0]);
    }

    #[test]
    fn test_row_operations() {
        let mut m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]).unwrap();

        m.swap_rows(2, 0).unwrap();
        assert_eq!(m.row(0), &[5.0, 6.0]);
        assert_eq!(m.row(2), &[1.0, 2.0]);

        m.scale_row(1, 0.5).unwrap();
        assert_eq!(m.row(1), &[1.5, 2.0]);

        m.shear_row(0, 1, -2.0).unwrap();
        assert_eq!(m.row(0), &[2.0, 2.0]);
    }

    #[test]
    fn test_row_operation_contracts() {
        let mut m = Matrix::identity(3).unwrap();
        assert_eq!(
            m.swap_rows(1, 1),
            Err(MatrixError::SameRow { op: "swap_rows", row: 1 })
        );
        assert_eq!(
            m.shear_row(2, 2, 1.0),
            Err(MatrixError::SameRow { op: "shear_row", row: 2 })
        );
        assert_eq!(
            m.scale_row(0, 0.0),
            Err(MatrixError::ZeroScalar { op: "scale_row" })
        );
        assert_eq!(
            m.swap_rows(0, 3),
            Err(MatrixError::RowOutOfRange {
                op: "swap_rows",
                row: 3,
                rows: 3
            })
        );
        assert_eq!(m, Matrix::identity(3).unwrap());
    }

    #[test]
    fn test_copy_from_checks_shape() {
        let src = Matrix::from_rows(&[[1.0, 2.0]]).unwrap();
        let mut dst = Matrix::zeros(2, 1).unwrap();
        assert!(dst.copy_from(&src).is_err());

        let mut dst = Matrix::zeros(1, 2).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn test_display_table() {
        let m = Matrix::from_rows(&[[1.0, -2.5], [10.126, 0.0]]).unwrap();
        assert_eq!(m.to_string(), "  1.00  -2.50\n 10.13   0.00\n");
    }

    #[test]
    fn test_serde_roundtrip_validates() {
        let m = Matrix::from_rows(&[[1.0, 2.0], [3.0, 4.0]]).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, r#"{"rows":2,"cols":2,"data":[1.0,2.0,3.0,4.0]}"#);
        let back: Matrix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);

        let bad = r#"{"rows":2,"cols":2,"data":[1.0,2.0,3.0]}"#;
        assert!(serde_json::from_str::<Matrix>(bad).is_err());

        let wrapped = format!(r#"{{"rows":{0},"cols":{0},"data":[]}}"#, 1usize << (usize::BITS / 2));
        assert!(serde_json::from_str::<Matrix>(&wrapped).is_err());
    }
}
