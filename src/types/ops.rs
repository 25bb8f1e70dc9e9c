//! Binary matrix algebra writing into caller-allocated destinations.
//!
//! Shapes are checked before any element is written.

use crate::error::MatrixError;
use crate::types::matrix::Matrix;

/// `c = a + b`
pub fn add(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), MatrixError> {
    elementwise("add", a, b, c, |x, y| x + y)
}

/// `c = a - b`
pub fn subtract(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), MatrixError> {
    elementwise("subtract", a, b, c, |x, y| x - y)
}

fn elementwise(
    op: &'static str,
    a: &Matrix,
    b: &Matrix,
    c: &mut Matrix,
    f: impl Fn(f64, f64) -> f64,
) -> Result<(), MatrixError> {
    b.require_shape(op, a.shape())?;
    c.require_shape(op, a.shape())?;
    let (rows, cols) = a.shape();
    for i in 0..rows {
        for j in 0..cols {
            c[(i, j)] = f(a[(i, j)], b[(i, j)]);
        }
    }
    Ok(())
}

/// `c = a · b`
pub fn multiply(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), MatrixError> {
    if a.cols() != b.rows() {
        return Err(MatrixError::DimensionMismatch {
            op: "multiply",
            expected: (a.cols(), b.cols()),
            got: b.shape(),
        });
    }
    c.require_shape("multiply", (a.rows(), b.cols()))?;
    for i in 0..c.rows() {
        for j in 0..c.cols() {
            let mut sum = 0.0;
            for k in 0..a.cols() {
                sum += a[(i, k)] * b[(k, j)];
            }
            c[(i, j)] = sum;
        }
    }
    Ok(())
}

/// `c = a · bᵗ`, dotting rows of `a` against rows of `b`.
pub fn multiply_by_transpose(a: &Matrix, b: &Matrix, c: &mut Matrix) -> Result<(), MatrixError> {
    if a.cols() != b.cols() {
        return Err(MatrixError::DimensionMismatch {
            op: "multiply_by_transpose",
            expected: (b.rows(), a.cols()),
            got: b.shape(),
        });
    }
    c.require_shape("multiply_by_transpose", (a.rows(), b.rows()))?;
    for i in 0..c.rows() {
        for j in 0..c.cols() {
            c[(i, j)] = a.row(i).iter().zip(b.row(j)).map(|(x, y)| x * y).sum();
        }
    }
    Ok(())
}

/// `output = inputᵗ`
pub fn transpose(input: &Matrix, output: &mut Matrix) -> Result<(), MatrixError> {
    output.require_shape("transpose", (input.cols(), input.rows()))?;
    for i in 0..input.rows() {
        for j in 0..input.cols() {
            output[(j, i)] = input[(i, j)];
        }
    }
    Ok(())
}

/// Copy `source` into `destination`.
pub fn copy(source: &Matrix, destination: &mut Matrix) -> Result<(), MatrixError> {
    destination.copy_from(source)
}

/// True iff every pair of entries differs by at most `tolerance`.
pub fn equal(a: &Matrix, b: &Matrix, tolerance: f64) -> Result<bool, MatrixError> {
    b.require_shape("equal", a.shape())?;
    Ok(a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .all(|(x, y)| (x - y).abs() <= tolerance))
}
