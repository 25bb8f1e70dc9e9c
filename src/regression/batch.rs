//! Batched plane fits, z = a·x + b·y + c, one per point-set.
//!
//! Input is a flat `f32` buffer of `count` point-sets, each `rows` slots of
//! (x, y, z). Slots whose three coordinates are all exactly zero are unused
//! and skipped. A set with too few valid samples is degenerate and gets
//! all-zero coefficients; that is a defined result, not an error.

use serde::{Deserialize, Serialize};

use crate::config::BatchConfig;
use crate::error::{EngineError, EngineResult};
use crate::regression::least_squares::fit_matrix;
use crate::types::{Matrix, PLANE_COEFFS, PLANE_COLS};

/// Which point-sets ended up in which outcome, by index.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub fitted: Vec<usize>,
    /// Fewer valid samples than `min_valid_rows`
    pub degenerate: Vec<usize>,
    /// Enough samples but XᵗX was singular (e.g. all x equal)
    pub singular: Vec<usize>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.fitted.len() + self.degenerate.len() + self.singular.len()
    }

    fn merge(&mut self, other: BatchReport) {
        self.fitted.extend(other.fitted);
        self.degenerate.extend(other.degenerate);
        self.singular.extend(other.singular);
    }
}

enum SetFit {
    Fitted([f64; PLANE_COEFFS]),
    Degenerate { valid: usize },
    Singular,
}

#[derive(Clone, Debug, Default)]
pub struct BatchFitter {
    config: BatchConfig,
}

impl BatchFitter {
    pub fn new(config: BatchConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Fit every point-set of `points` (shape `[count, rows, 3]`) and write
    /// the coefficients to `m[index*3 .. index*3 + 3]`.
    pub fn fit(&self, points: &[f32], shape: [usize; 3], m: &mut [f32]) -> EngineResult<BatchReport> {
        let [count, rows, cols] = shape;
        if cols != PLANE_COLS {
            return Err(EngineError::Shape(format!(
                "point-sets must have {} columns (x, y, z), got {}",
                PLANE_COLS, cols
            )));
        }
        let needed = rows
            .checked_mul(cols)
            .and_then(|set_len| count.checked_mul(set_len).map(|total| (set_len, total)));
        let Some((set_len, total)) = needed else {
            return Err(EngineError::Shape(format!("shape {:?} overflows", shape)));
        };
        if total != points.len() {
            return Err(EngineError::Shape(format!(
                "points buffer holds {} values, shape {:?} needs {}",
                points.len(),
                shape,
                total
            )));
        }
        if count.checked_mul(PLANE_COEFFS) != Some(m.len()) {
            return Err(EngineError::Shape(format!(
                "output buffer must hold {} values per set for {} sets, holds {}",
                PLANE_COEFFS,
                count,
                m.len()
            )));
        }

        if set_len == 0 {
            // No sample slots at all: every set is degenerate.
            m.fill(0.0);
            return Ok(BatchReport {
                degenerate: (0..count).collect(),
                ..BatchReport::default()
            });
        }

        let threads = self.config.threads.min(count);
        let report = if threads <= 1 {
            self.fit_range(0, points, set_len, m)?
        } else {
            self.fit_parallel(threads, count, points, set_len, m)?
        };

        log::debug!(
            "batched_fit: {} sets, {} fitted, {} degenerate, {} singular",
            count,
            report.fitted.len(),
            report.degenerate.len(),
            report.singular.len()
        );
        Ok(report)
    }

    fn fit_parallel(
        &self,
        threads: usize,
        count: usize,
        points: &[f32],
        set_len: usize,
        m: &mut [f32],
    ) -> EngineResult<BatchReport> {
        let sets_per_thread = count.div_ceil(threads);

        let results = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = points
                .chunks(sets_per_thread * set_len)
                .zip(m.chunks_mut(sets_per_thread * PLANE_COEFFS))
                .enumerate()
                .map(|(worker, (chunk, out))| {
                    let first = worker * sets_per_thread;
                    scope.spawn(move |_| self.fit_range(first, chunk, set_len, out))
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|e| std::panic::resume_unwind(e));

        let mut report = BatchReport::default();
        for result in results {
            report.merge(result?);
        }
        Ok(report)
    }

    /// Fit consecutive point-sets; `first` is the index of the first one.
    fn fit_range(&self, first: usize, points: &[f32], set_len: usize, out: &mut [f32]) -> EngineResult<BatchReport> {
        let mut report = BatchReport::default();
        for (offset, (set, coeffs)) in points
            .chunks_exact(set_len)
            .zip(out.chunks_exact_mut(PLANE_COEFFS))
            .enumerate()
        {
            let index = first + offset;
            match self.fit_set(set)? {
                SetFit::Fitted(w) => {
                    for (slot, value) in coeffs.iter_mut().zip(w) {
                        *slot = value as f32;
                    }
                    report.fitted.push(index);
                }
                SetFit::Degenerate { valid } => {
                    log::debug!("batched_fit: set {} has {} valid samples, using zeros", index, valid);
                    coeffs.fill(0.0);
                    report.degenerate.push(index);
                }
                SetFit::Singular => {
                    log::warn!("batched_fit: set {} has a singular normal matrix, using zeros", index);
                    coeffs.fill(0.0);
                    report.singular.push(index);
                }
            }
        }
        Ok(report)
    }

    fn fit_set(&self, set: &[f32]) -> EngineResult<SetFit> {
        let valid: Vec<&[f32]> = set
            .chunks_exact(PLANE_COLS)
            .filter(|sample| sample.iter().any(|&v| v != 0.0))
            .collect();
        if valid.len() < self.config.min_valid_rows {
            return Ok(SetFit::Degenerate { valid: valid.len() });
        }

        // Design [x, y, 1], target z
        let mut design = Matrix::zeros(valid.len(), PLANE_COEFFS)?;
        let mut target = Matrix::zeros(valid.len(), 1)?;
        for (i, sample) in valid.iter().enumerate() {
            design[(i, 0)] = f64::from(sample[0]);
            design[(i, 1)] = f64::from(sample[1]);
            design[(i, 2)] = 1.0;
            target[(i, 0)] = f64::from(sample[2]);
        }

        match fit_matrix(&design, &target) {
            Ok(w) => Ok(SetFit::Fitted([w[(0, 0)], w[(1, 0)], w[(2, 0)]])),
            Err(err) if err.is_singular() => Ok(SetFit::Singular),
            Err(err) => Err(err),
        }
    }
}

/// [`BatchFitter::fit`] with the default settings (4 valid samples minimum,
/// sequential).
pub fn batched_fit(points: &[f32], shape: [usize; 3], m: &mut [f32]) -> EngineResult<BatchReport> {
    BatchFitter::default().fit(points, shape, m)
}
