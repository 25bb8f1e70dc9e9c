//! Dimension constants and fixed-size aliases for the constant-rate tracker.
//!
//! The engine itself works on runtime-sized [`Matrix`](super::Matrix) values;
//! the nalgebra aliases describe the same shapes at compile time and are what
//! callers reach for when they cross-check against nalgebra.

use nalgebra::{SMatrix, SVector};

// ===== State Dimensions =====
pub const STATE_DIM: usize = 3; // (x, y, rate)

// ===== Measurement Dimensions =====
pub const MEASURE_DIM: usize = 2; // (x, y)

// ===== Regression Dimensions =====
pub const PLANE_COLS: usize = 3; // (x, y, z) per sample
pub const PLANE_COEFFS: usize = 3; // (a, b, c) for z = a·x + b·y + c

// ===== Tracker Types =====
pub type StateVec = SVector<f64, STATE_DIM>;
pub type StateMat = SMatrix<f64, STATE_DIM, STATE_DIM>;
pub type MeasureVec = SVector<f64, MEASURE_DIM>;
pub type MeasureNoise = SMatrix<f64, MEASURE_DIM, MEASURE_DIM>;
pub type KalmanGain = SMatrix<f64, STATE_DIM, MEASURE_DIM>; // 3×2
pub type ObservationMat = SMatrix<f64, MEASURE_DIM, STATE_DIM>; // 2×3
