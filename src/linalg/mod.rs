pub mod gauss_jordan;

pub use gauss_jordan::{invert, inverse};
