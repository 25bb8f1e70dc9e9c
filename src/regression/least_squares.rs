//! Closed-form least squares via the normal equations, w = (XᵗX)⁻¹·Xᵗ·Y.
//!
//! The flat-buffer entry point takes and returns `f32`; all arithmetic is
//! done in `f64` on [`Matrix`] values. No regularisation is applied, so a
//! rank-deficient design is reported as singular.

use crate::error::{EngineError, EngineResult};
use crate::linalg::invert;
use crate::types::ops::{multiply, transpose};
use crate::types::Matrix;

/// Solve the normal equations for an n×k design `x` and n×m targets `y`,
/// returning the k×m coefficients.
pub fn fit_matrix(x: &Matrix, y: &Matrix) -> EngineResult<Matrix> {
    let (n, k) = x.shape();
    y.require_shape("fit: Y", (n, y.cols()))?;

    let mut xt = Matrix::zeros(k, n)?;
    transpose(x, &mut xt)?;

    let mut xtx = Matrix::zeros(k, k)?;
    multiply(&xt, x, &mut xtx)?;

    let mut xtx_inv = Matrix::zeros(k, k)?;
    if !invert(&mut xtx, &mut xtx_inv)? {
        return Err(EngineError::singular("normal matrix XᵗX (rank-deficient design)"));
    }

    let mut xtx_inv_xt = Matrix::zeros(k, n)?;
    multiply(&xtx_inv, &xt, &mut xtx_inv_xt)?;

    let mut w = Matrix::zeros(k, y.cols())?;
    multiply(&xtx_inv_xt, y, &mut w)?;
    Ok(w)
}

/// Fit `y ≈ X·w` from flat row-major buffers.
///
/// # Arguments
/// * `x` - design matrix, `shape_x = [n, k]`
/// * `y` - targets, `shape_y = [n, 1]`
/// * `w` - output coefficients, length `k`
pub fn fit(
    x: &[f32],
    shape_x: [usize; 2],
    y: &[f32],
    shape_y: [usize; 2],
    w: &mut [f32],
) -> EngineResult<()> {
    let [n, k] = shape_x;
    if shape_y != [n, 1] {
        return Err(EngineError::Shape(format!(
            "Y must have shape [{}, 1], got {:?}",
            n, shape_y
        )));
    }
    if w.len() != k {
        return Err(EngineError::Shape(format!(
            "output buffer must hold {} coefficients, holds {}",
            k,
            w.len()
        )));
    }

    let design = matrix_from_f32("X", x, shape_x)?;
    let target = matrix_from_f32("Y", y, shape_y)?;
    let coeffs = fit_matrix(&design, &target)?;

    for (slot, value) in w.iter_mut().zip(coeffs.as_slice()) {
        *slot = *value as f32;
    }
    log::debug!("fit: {} samples, {} coefficients: {:?}", n, k, w);
    Ok(())
}

/// Widen a flat `f32` buffer into a `f64` matrix after checking its length.
pub(crate) fn matrix_from_f32(name: &str, values: &[f32], shape: [usize; 2]) -> EngineResult<Matrix> {
    let [rows, cols] = shape;
    if rows.checked_mul(cols) != Some(values.len()) {
        return Err(EngineError::Shape(format!(
            "{} buffer holds {} values, shape {:?} needs {}",
            name,
            values.len(),
            shape,
            rows.saturating_mul(cols)
        )));
    }
    let widened: Vec<f64> = values.iter().map(|&v| f64::from(v)).collect();
    Ok(Matrix::from_row_slice(rows, cols, &widened)?)
}
