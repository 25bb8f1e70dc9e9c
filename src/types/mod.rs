pub mod interop;
pub mod linalg;
pub mod matrix;
pub mod ops;

pub use linalg::*;
pub use matrix::Matrix;

use serde::{Deserialize, Serialize};

/// One position fix fed to the tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Observed (x, y)
    pub z: [f64; MEASURE_DIM],
    /// Seconds since the previous observation
    pub dt: f64,
}
