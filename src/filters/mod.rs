pub mod kalman_cv;

pub use kalman_cv::{predict, Correction, KalmanPredictor, TrackState};
