//! Matrix inversion by Gauss-Jordan elimination.
//!
//! The input is driven to the identity with elementary row operations while
//! the same operations are replayed on a second matrix seeded as the
//! identity, which therefore ends up holding the inverse.
//!
//! Pivoting takes the first non-zero entry below a zero diagonal element.
//! There is no partial pivoting, so this is meant for the small,
//! well-conditioned 2×2 / 3×3 systems the tracker and fitters produce.

use crate::error::MatrixError;
use crate::types::Matrix;

/// Invert `input` into `output`, destroying `input`.
///
/// Returns `Ok(true)` when `output` holds the inverse and `Ok(false)` when the
/// matrix is singular, in which case `output` is left in an undefined state.
/// Shape violations (non-square input, output of a different size) are
/// reported as `Err` before anything is touched.
pub fn invert(input: &mut Matrix, output: &mut Matrix) -> Result<bool, MatrixError> {
    input.require_square("invert")?;
    output.require_shape("invert", input.shape())?;
    output.set_identity()?;

    let n = input.rows();
    for i in 0..n {
        if input[(i, i)] == 0.0 {
            let Some(r) = (i + 1..n).find(|&r| input[(r, i)] != 0.0) else {
                log::debug!("invert: no non-zero pivot in column {}, matrix is singular", i);
                return Ok(false);
            };
            input.swap_rows(i, r)?;
            output.swap_rows(i, r)?;
        }

        let scalar = 1.0 / input[(i, i)];
        if scalar == 0.0 || !scalar.is_finite() {
            // Pivot overflowed or underflowed; elimination cannot continue.
            log::debug!("invert: unusable pivot {} in column {}", input[(i, i)], i);
            return Ok(false);
        }
        input.scale_row(i, scalar)?;
        output.scale_row(i, scalar)?;

        for j in 0..n {
            if j == i {
                continue;
            }
            let shear = -input[(j, i)];
            input.shear_row(j, i, shear)?;
            output.shear_row(j, i, shear)?;
        }
    }

    Ok(true)
}

/// Non-destructive wrapper around [`invert`]: returns `None` when singular.
pub fn inverse(m: &Matrix) -> Result<Option<Matrix>, MatrixError> {
    let mut work = m.clone();
    let mut out = Matrix::zeros(m.rows(), m.cols())?;
    if invert(&mut work, &mut out)? {
        Ok(Some(out))
    } else {
        Ok(None)
    }
}
