//! Constant-rate Kalman predictor for 2D tracks
//!
//! State Vector (3D):
//! [0]: Position X
//! [1]: Position Y
//! [2]: Rate term, integrated into X over dt
//!
//! Each call corrects the state with one (x, y) observation and then projects
//! it forward by dt. The model matrices are rebuilt on every call and all
//! intermediates are local, so the only state carried between calls is the
//! caller's `x` and `P`.

use serde::{Deserialize, Serialize};

use crate::config::KalmanConfig;
use crate::error::{EngineError, EngineResult};
use crate::linalg::invert;
use crate::types::ops::{add, multiply, multiply_by_transpose, subtract};
use crate::types::{Matrix, Observation, MEASURE_DIM, STATE_DIM};

/// Caller-owned tracker state carried across predict calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// State vector [3x1]
    pub x: Matrix,
    /// Covariance matrix [3x3]
    pub p: Matrix,
}

impl TrackState {
    /// Start a track at (x, y) with the given rate and a diagonal covariance.
    pub fn new(x: f64, y: f64, rate: f64, variance: f64) -> EngineResult<Self> {
        let state = Self {
            x: Matrix::column(&[x, y, rate])?,
            p: Matrix::from_rows(&[
                [variance, 0.0, 0.0],
                [0.0, variance, 0.0],
                [0.0, 0.0, variance],
            ])?,
        };
        Ok(state)
    }

    /// Check the shapes, e.g. after deserialising.
    pub fn validate(&self) -> EngineResult<()> {
        self.x.require_shape("track state x", (STATE_DIM, 1))?;
        self.p.require_shape("track state P", (STATE_DIM, STATE_DIM))?;
        Ok(())
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x[(0, 0)], self.x[(1, 0)])
    }

    pub fn rate(&self) -> f64 {
        self.x[(2, 0)]
    }

    pub fn covariance_trace(&self) -> EngineResult<f64> {
        Ok(self.p.trace()?)
    }
}

/// Output of the measurement correction, before projection.
#[derive(Clone, Debug)]
pub struct Correction {
    /// Corrected state x + K·(Z − H·x) [3x1]
    pub x: Matrix,
    /// Corrected covariance (I − K·H)·P [3x3]
    pub p: Matrix,
    /// Z − H·x [2x1]
    pub innovation: Matrix,
    /// Kalman gain [3x2]
    pub gain: Matrix,
}

#[derive(Clone, Debug, Default)]
pub struct KalmanPredictor {
    config: KalmanConfig,
}

impl KalmanPredictor {
    pub fn new(config: KalmanConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &KalmanConfig {
        &self.config
    }

    /// State transition A: x integrates the rate term, y and rate hold.
    pub fn transition(dt: f64) -> EngineResult<Matrix> {
        Ok(Matrix::from_rows(&[
            [1.0, 0.0, dt],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ])?)
    }

    /// Observation H: both positions, not the rate.
    pub fn observation() -> EngineResult<Matrix> {
        Ok(Matrix::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]])?)
    }

    fn process_noise(&self) -> EngineResult<Matrix> {
        let q = self.config.process_noise;
        Ok(Matrix::from_rows(&[[q, 0.0, 0.0], [0.0, q, 0.0], [0.0, 0.0, q]])?)
    }

    fn measurement_noise(&self) -> EngineResult<Matrix> {
        let r = self.config.measurement_noise;
        Ok(Matrix::from_rows(&[[r, 0.0], [0.0, r]])?)
    }

    /// Correct `x`/`P` with observation `z` without touching the inputs.
    ///
    /// Fails with [`EngineError::Singular`] if S = H·P·Hᵗ + R cannot be
    /// inverted.
    pub fn correct(&self, x: &Matrix, p: &Matrix, z: &Matrix) -> EngineResult<Correction> {
        x.require_shape("predict: x", (STATE_DIM, 1))?;
        p.require_shape("predict: P", (STATE_DIM, STATE_DIM))?;
        z.require_shape("predict: Z", (MEASURE_DIM, 1))?;

        let h = Self::observation()?;
        let r = self.measurement_noise()?;

        // S = H·P·Hᵗ + R
        let mut hp = Matrix::zeros(MEASURE_DIM, STATE_DIM)?;
        multiply(&h, p, &mut hp)?;
        let mut hph = Matrix::zeros(MEASURE_DIM, MEASURE_DIM)?;
        multiply_by_transpose(&hp, &h, &mut hph)?;
        let mut s = Matrix::zeros(MEASURE_DIM, MEASURE_DIM)?;
        add(&hph, &r, &mut s)?;

        // K = P·Hᵗ·S⁻¹
        let mut s_inv = Matrix::zeros(MEASURE_DIM, MEASURE_DIM)?;
        if !invert(&mut s, &mut s_inv)? {
            return Err(EngineError::singular("innovation covariance S = H·P·Hᵗ + R"));
        }
        let mut pht = Matrix::zeros(STATE_DIM, MEASURE_DIM)?;
        multiply_by_transpose(p, &h, &mut pht)?;
        let mut gain = Matrix::zeros(STATE_DIM, MEASURE_DIM)?;
        multiply(&pht, &s_inv, &mut gain)?;

        // x_post = x + K·(Z − H·x)
        let mut hx = Matrix::zeros(MEASURE_DIM, 1)?;
        multiply(&h, x, &mut hx)?;
        let mut innovation = Matrix::zeros(MEASURE_DIM, 1)?;
        subtract(z, &hx, &mut innovation)?;
        let mut dx = Matrix::zeros(STATE_DIM, 1)?;
        multiply(&gain, &innovation, &mut dx)?;
        let mut x_post = Matrix::zeros(STATE_DIM, 1)?;
        add(x, &dx, &mut x_post)?;

        // P_post = (I − K·H)·P, from the prior P
        let mut i_kh = Matrix::zeros(STATE_DIM, STATE_DIM)?;
        multiply(&gain, &h, &mut i_kh)?;
        i_kh.subtract_from_identity()?;
        let mut p_post = Matrix::zeros(STATE_DIM, STATE_DIM)?;
        multiply(&i_kh, p, &mut p_post)?;

        Ok(Correction {
            x: x_post,
            p: p_post,
            innovation,
            gain,
        })
    }

    /// Project a corrected state forward: (A·x, A·P·Aᵗ + Q).
    pub fn project(&self, x_post: &Matrix, p_post: &Matrix, dt: f64) -> EngineResult<(Matrix, Matrix)> {
        if !dt.is_finite() {
            return Err(EngineError::InvalidParameter(format!("dt must be finite, got {}", dt)));
        }
        let a = Self::transition(dt)?;
        let q = self.process_noise()?;

        let mut x_next = Matrix::zeros(STATE_DIM, 1)?;
        multiply(&a, x_post, &mut x_next)?;

        let mut ap = Matrix::zeros(STATE_DIM, STATE_DIM)?;
        multiply(&a, p_post, &mut ap)?;
        let mut apa = Matrix::zeros(STATE_DIM, STATE_DIM)?;
        multiply_by_transpose(&ap, &a, &mut apa)?;
        let mut p_next = Matrix::zeros(STATE_DIM, STATE_DIM)?;
        add(&apa, &q, &mut p_next)?;

        Ok((x_next, p_next))
    }

    /// One correct-then-project cycle, updating `x` and `p` in place.
    ///
    /// On any error `x` and `p` are left as they were.
    pub fn predict(&self, x: &mut Matrix, p: &mut Matrix, z: &Matrix, dt: f64) -> EngineResult<()> {
        if !dt.is_finite() {
            return Err(EngineError::InvalidParameter(format!("dt must be finite, got {}", dt)));
        }
        let corrected = self.correct(x, p, z)?;
        let (x_next, p_next) = self.project(&corrected.x, &corrected.p, dt)?;

        log::trace!(
            "predict: dt={:.3} innovation=({:.3}, {:.3}) x=({:.3}, {:.3}, {:.3})",
            dt,
            corrected.innovation[(0, 0)],
            corrected.innovation[(1, 0)],
            x_next[(0, 0)],
            x_next[(1, 0)],
            x_next[(2, 0)]
        );

        x.copy_from(&x_next)?;
        p.copy_from(&p_next)?;
        Ok(())
    }

    /// Feed one observation into a [`TrackState`].
    pub fn step(&self, state: &mut TrackState, observation: &Observation) -> EngineResult<()> {
        let z = Matrix::column(&observation.z)?;
        self.predict(&mut state.x, &mut state.p, &z, observation.dt)
    }
}

/// [`KalmanPredictor::predict`] with the default noise levels
/// (Q = 0.001·I₃, R = I₂).
pub fn predict(x: &mut Matrix, p: &mut Matrix, z: &Matrix, dt: f64) -> EngineResult<()> {
    KalmanPredictor::default().predict(x, p, z, dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ops::equal;
    use crate::types::{KalmanGain, MeasureNoise, MeasureVec, ObservationMat, StateMat, StateVec};
    use approx::assert_abs_diff_eq;
    use nalgebra::DMatrix;

    fn reference_scenario() -> (Matrix, Matrix, Matrix) {
        (
            Matrix::column(&[0.0, 0.0, 1.0]).unwrap(),
            Matrix::identity(3).unwrap(),
            Matrix::column(&[1.0, 0.0]).unwrap(),
        )
    }

    #[test]
    fn test_predict_reference_values() {
        let (mut x, mut p, z) = reference_scenario();
        predict(&mut x, &mut p, &z, 1.0).unwrap();

        // Corrected x = [0.5, 0, 1], then x += rate * dt.
        assert_eq!(x.shape(), (3, 1));
        assert_abs_diff_eq!(x[(0, 0)], 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(1, 0)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(x[(2, 0)], 1.0, epsilon = 1e-12);

        let expected = Matrix::from_rows(&[
            [1.501, 0.0, 1.0],
            [0.0, 0.501, 0.0],
            [1.0, 0.0, 1.001],
        ])
        .unwrap();
        assert!(equal(&p, &expected, 1e-12).unwrap());
    }

    #[test]
    fn test_correction_shrinks_covariance() {
        let (x, p, z) = reference_scenario();
        let predictor = KalmanPredictor::default();
        let corrected = predictor.correct(&x, &p, &z).unwrap();

        assert!(corrected.p.trace().unwrap() < p.trace().unwrap());
        // Position x moved toward the observation.
        assert!(corrected.x[(0, 0)] > 0.0 && corrected.x[(0, 0)] < 1.0);
        assert_eq!(corrected.innovation.as_slice(), &[1.0, 0.0]);
        assert_abs_diff_eq!(corrected.gain[(0, 0)], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(corrected.gain[(2, 1)], 0.0, epsilon = 1e-12);

        // The full cycle ends below a pure projection of the prior.
        let (_, projected_prior) = predictor.project(&x, &p, 1.0).unwrap();
        let (_, p_next) = predictor.project(&corrected.x, &corrected.p, 1.0).unwrap();
        assert!(p_next.trace().unwrap() < projected_prior.trace().unwrap());
    }

    #[test]
    fn test_singular_innovation_leaves_state_untouched() {
        // H·P·Hᵗ = -I cancels R = I.
        let mut x = Matrix::column(&[3.0, 4.0, 0.5]).unwrap();
        let mut p = Matrix::from_rows(&[[-1.0, 0.0, 0.0], [0.0, -1.0, 0.0], [0.0, 0.0, 2.0]]).unwrap();
        let z = Matrix::column(&[1.0, 1.0]).unwrap();
        let (x0, p0) = (x.clone(), p.clone());

        let err = predict(&mut x, &mut p, &z, 1.0).unwrap_err();
        assert!(err.is_singular());
        assert_eq!(x, x0);
        assert_eq!(p, p0);
    }

    #[test]
    fn test_shape_and_dt_contracts() {
        let (mut x, mut p, z) = reference_scenario();
        let mut bad_x = Matrix::column(&[0.0, 0.0]).unwrap();
        let err = predict(&mut bad_x, &mut p, &z, 1.0).unwrap_err();
        assert!(err.is_contract_violation());

        let bad_z = Matrix::column(&[1.0, 0.0, 0.0]).unwrap();
        assert!(predict(&mut x, &mut p, &bad_z, 1.0).is_err());

        let err = predict(&mut x, &mut p, &z, f64::NAN).unwrap_err();
        assert!(matches!(err, EngineError::InvalidParameter(_)));
    }

    #[test]
    fn test_matches_nalgebra_reference() {
        let dt = 0.5;
        let x0 = StateVec::new(2.0, -1.0, 0.3);
        let p0 = StateMat::new(2.0, 0.1, 0.4, 0.1, 1.5, 0.0, 0.4, 0.0, 0.8);
        let z0 = MeasureVec::new(2.4, -0.6);

        let a = StateMat::new(1.0, 0.0, dt, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0);
        let h = ObservationMat::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0);
        let s = h * p0 * h.transpose() + MeasureNoise::identity();
        let k: KalmanGain = p0 * h.transpose() * s.try_inverse().unwrap();
        let x_post = x0 + k * (z0 - h * x0);
        let p_post = (StateMat::identity() - k * h) * p0;
        let x_expected = a * x_post;
        let p_expected = a * p_post * a.transpose() + StateMat::identity() * 0.001;

        let mut x = Matrix::column(x0.as_slice()).unwrap();
        let mut p = Matrix::try_from(&DMatrix::from_column_slice(3, 3, p0.as_slice())).unwrap();
        let z = Matrix::column(z0.as_slice()).unwrap();
        predict(&mut x, &mut p, &z, dt).unwrap();

        for (ours, theirs) in x.as_slice().iter().zip(x_expected.iter()) {
            assert_abs_diff_eq!(*ours, *theirs, epsilon = 1e-12);
        }
        let p_ours = DMatrix::from(&p);
        for (ours, theirs) in p_ours.iter().zip(p_expected.iter()) {
            assert_abs_diff_eq!(*ours, *theirs, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_track_state_step_converges() {
        let predictor = KalmanPredictor::new(KalmanConfig {
            process_noise: 0.001,
            measurement_noise: 0.25,
        })
        .unwrap();
        let mut state = TrackState::new(0.0, 0.0, 0.0, 10.0).unwrap();

        // Stationary target at (5, -2).
        for _ in 0..50 {
            let obs = Observation { z: [5.0, -2.0], dt: 0.1 };
            predictor.step(&mut state, &obs).unwrap();
        }
        let (px, py) = state.position();
        assert_abs_diff_eq!(px, 5.0, epsilon = 0.1);
        assert_abs_diff_eq!(py, -2.0, epsilon = 0.1);
        assert!(state.covariance_trace().unwrap() < 30.0);
        state.validate().unwrap();
    }

    #[test]
    fn test_track_state_serde() {
        let state = TrackState::new(1.0, 2.0, 0.5, 1.0).unwrap();
        let json = serde_json::to_string(&state).unwrap();
        let back: TrackState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
        assert_eq!(back.rate(), 0.5);

        let bad = TrackState {
            x: Matrix::column(&[1.0, 2.0]).unwrap(),
            p: Matrix::identity(3).unwrap(),
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let err = KalmanPredictor::new(KalmanConfig {
            process_noise: f64::INFINITY,
            measurement_noise: 1.0,
        })
        .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
