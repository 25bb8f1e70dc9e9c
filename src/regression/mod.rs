pub mod batch;
pub mod least_squares;

pub use batch::{batched_fit, BatchFitter, BatchReport};
pub use least_squares::{fit, fit_matrix};
