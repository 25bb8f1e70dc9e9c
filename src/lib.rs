//! Small dense linear-algebra engine for track estimation.
//!
//! - [`types`]: the [`Matrix`] entity and its elementary operations
//! - [`linalg`]: Gauss-Jordan inversion
//! - [`filters`]: constant-rate Kalman predict/update step
//! - [`regression`]: least-squares fits, single and batched
//!
//! ```
//! use track_matrix_rs::{filters, Matrix};
//!
//! let mut x = Matrix::column(&[0.0, 0.0, 1.0]).unwrap();
//! let mut p = Matrix::identity(3).unwrap();
//! let z = Matrix::column(&[1.0, 0.0]).unwrap();
//! filters::predict(&mut x, &mut p, &z, 1.0).unwrap();
//! assert!((x[(0, 0)] - 1.5).abs() < 1e-12);
//! ```

pub mod config;
pub mod error;
pub mod filters;
pub mod linalg;
pub mod regression;
pub mod types;

pub use config::{BatchConfig, EngineConfig, KalmanConfig};
pub use error::{EngineError, EngineResult, MatrixError};
pub use linalg::invert;
pub use types::Matrix;
