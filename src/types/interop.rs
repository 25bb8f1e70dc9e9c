//! Conversions between [`Matrix`] and the nalgebra / ndarray containers used
//! elsewhere in the tracking stack.

use nalgebra::DMatrix;
use ndarray::Array2;

use crate::error::MatrixError;
use crate::types::matrix::Matrix;

impl From<&Matrix> for DMatrix<f64> {
    fn from(m: &Matrix) -> Self {
        DMatrix::from_row_slice(m.rows(), m.cols(), m.as_slice())
    }
}

impl TryFrom<&DMatrix<f64>> for Matrix {
    type Error = MatrixError;

    fn try_from(m: &DMatrix<f64>) -> Result<Self, Self::Error> {
        let mut out = Matrix::zeros(m.nrows(), m.ncols())?;
        for i in 0..m.nrows() {
            for j in 0..m.ncols() {
                out[(i, j)] = m[(i, j)];
            }
        }
        Ok(out)
    }
}

impl Matrix {
    /// Copy into an ndarray `Array2` with the same shape.
    pub fn to_array2(&self) -> Array2<f64> {
        Array2::from_shape_fn(self.shape(), |(i, j)| self[(i, j)])
    }

    /// Copy from an ndarray `Array2`; works for any memory layout.
    pub fn from_array2(array: &Array2<f64>) -> Result<Self, MatrixError> {
        let (rows, cols) = array.dim();
        let mut out = Matrix::zeros(rows, cols)?;
        for ((i, j), value) in array.indexed_iter() {
            out[(i, j)] = *value;
        }
        Ok(out)
    }
}
