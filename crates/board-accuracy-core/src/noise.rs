//! Bounded Gaussian noise on simulated 2D corner observations.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use crate::types::{CornerPoint, DetectorObservationSet, MarkerSnapshot};

/// Noise specification validation errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum NoiseSpecError {
    #[error("noise mean must be finite (got {0})")]
    InvalidMean(f64),
    #[error("noise std_dev must be finite and >= 0 (got {0})")]
    InvalidStdDev(f64),
    #[error("clamp multipliers must be finite, >= 0 and low <= high (low={low}, high={high})")]
    InvalidClamp { low: f64, high: f64 },
}

/// Gaussian corner noise, clamped at `2 * std_dev * clamp_multiplier_high`.
///
/// `clamp_multiplier_low` marks the nominal band; draws beyond it are only
/// counted in [`NoiseStats`], never altered.
#[derive(Clone, Copy, Debug)]
pub struct NoiseSpec {
    mean: f64,
    std_dev: f64,
    clamp_multiplier_low: f64,
    clamp_multiplier_high: f64,
    normal: Normal<f64>,
}

impl NoiseSpec {
    pub fn new(
        mean: f64,
        std_dev: f64,
        clamp_multiplier_low: f64,
        clamp_multiplier_high: f64,
    ) -> Result<Self, NoiseSpecError> {
        if !mean.is_finite() {
            return Err(NoiseSpecError::InvalidMean(mean));
        }
        if !std_dev.is_finite() || std_dev < 0.0 {
            return Err(NoiseSpecError::InvalidStdDev(std_dev));
        }
        let (low, high) = (clamp_multiplier_low, clamp_multiplier_high);
        if !low.is_finite() || !high.is_finite() || low < 0.0 || low > high {
            return Err(NoiseSpecError::InvalidClamp { low, high });
        }
        let normal =
            Normal::new(mean, std_dev).map_err(|_| NoiseSpecError::InvalidStdDev(std_dev))?;
        Ok(Self {
            mean,
            std_dev,
            clamp_multiplier_low: low,
            clamp_multiplier_high: high,
            normal,
        })
    }

    /// Zero-mean noise where two standard deviations equal `noise_level` pixels.
    pub fn from_noise_level(
        noise_level: f64,
        clamp_multiplier_low: f64,
        clamp_multiplier_high: f64,
    ) -> Result<Self, NoiseSpecError> {
        Self::new(0.0, noise_level / 2.0, clamp_multiplier_low, clamp_multiplier_high)
    }

    #[inline]
    pub fn mean(&self) -> f64 {
        self.mean
    }

    #[inline]
    pub fn std_dev(&self) -> f64 {
        self.std_dev
    }

    /// Largest absolute displacement applied to a coordinate.
    #[inline]
    pub fn clamp_bound(&self) -> f64 {
        2.0 * self.std_dev * self.clamp_multiplier_high
    }

    #[inline]
    pub fn nominal_bound(&self) -> f64 {
        2.0 * self.std_dev * self.clamp_multiplier_low
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R, stats: &mut NoiseStats) -> f64 {
        let bound = self.clamp_bound();
        let raw = self.normal.sample(rng);
        stats.samples += 1;
        if raw.abs() > self.nominal_bound() {
            stats.beyond_nominal += 1;
        }
        if raw.abs() > bound {
            stats.clamped += 1;
        }
        raw.clamp(-bound, bound)
    }
}

/// Counters collected while injecting noise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NoiseStats {
    /// Number of coordinate displacements drawn.
    pub samples: usize,
    /// Draws outside the nominal `2 * std_dev * clamp_multiplier_low` band.
    pub beyond_nominal: usize,
    /// Draws that were clamped to the high bound.
    pub clamped: usize,
}

impl NoiseStats {
    pub fn merge(&mut self, other: NoiseStats) {
        self.samples += other.samples;
        self.beyond_nominal += other.beyond_nominal;
        self.clamped += other.clamped;
    }
}

/// Displace every corner coordinate by an independent clamped Gaussian draw.
///
/// Returns a new observation set with the same detectors, markers and corner
/// order as the input.
pub fn inject_corner_noise<R: Rng + ?Sized>(
    observations: &DetectorObservationSet,
    spec: &NoiseSpec,
    rng: &mut R,
) -> (DetectorObservationSet, NoiseStats) {
    let mut stats = NoiseStats::default();
    let noisy: DetectorObservationSet = observations
        .iter()
        .map(|(detector_id, snapshots)| {
            let noisy_snapshots: Vec<MarkerSnapshot> = snapshots
                .iter()
                .map(|snapshot| MarkerSnapshot {
                    label: snapshot.label,
                    corner_points: snapshot
                        .corner_points
                        .iter()
                        .map(|c| {
                            let dx = spec.draw(rng, &mut stats);
                            let dy = spec.draw(rng, &mut stats);
                            CornerPoint::new(c.x_px + dx, c.y_px + dy)
                        })
                        .collect(),
                })
                .collect();
            (detector_id.clone(), noisy_snapshots)
        })
        .collect();
    (noisy, stats)
}
