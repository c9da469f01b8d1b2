//! Run parameters and their JSON representation.

use std::{fs, path::Path};

use board_accuracy_core::{DetectorIntrinsics, DetectorPose, MarkerId, NoiseSpec, NoiseSpecError};
use board_accuracy_sim::{detector_looking_at, SnapshotMotion, SCENE_NAMES};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum ParamsIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ParamsError {
    #[error("unknown scene '{0}'")]
    UnknownScene(String),
    #[error("marker size must be positive and finite, got {0}")]
    InvalidMarkerSize(f64),
    #[error("snapshot count must be at least 1")]
    NoSnapshots,
    #[error("at least one detector is required")]
    NoDetectors,
    #[error("detector '{0}' is listed twice")]
    DuplicateDetector(String),
    #[error("detector '{0}' looks at its own position")]
    DegeneratePlacement(String),
    #[error("invalid intrinsics: {0}")]
    InvalidIntrinsics(&'static str),
    #[error("invalid snapshot motion: {0}")]
    InvalidMotion(&'static str),
    #[error(transparent)]
    Noise(#[from] NoiseSpecError),
}

/// Where a detector sits and what it looks at, in world coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorPlacement {
    pub detector_id: String,
    pub eye: [f64; 3],
    pub target: [f64; 3],
}

impl DetectorPlacement {
    pub fn new(detector_id: impl Into<String>, eye: [f64; 3], target: [f64; 3]) -> Self {
        Self {
            detector_id: detector_id.into(),
            eye,
            target,
        }
    }

    pub fn to_pose(&self) -> DetectorPose {
        detector_looking_at(
            self.detector_id.clone(),
            Point3::from(self.eye),
            Point3::from(self.target),
        )
    }
}

/// Parameters of one accuracy run.
///
/// Missing fields in a JSON file fall back to [`AccuracyTestParams::default`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccuracyTestParams {
    /// One of [`board_accuracy_sim::SCENE_NAMES`].
    pub scene_name: String,
    /// Marker edge length in world units (mm).
    pub board_marker_size: f64,
    /// Shared by every detector.
    pub detector_intrinsics: DetectorIntrinsics,
    pub detectors: Vec<DetectorPlacement>,
    pub snapshot_count: usize,
    /// Nominal corner noise in pixels; two standard deviations.
    pub noise_level: f64,
    pub low_noise_multiplier: f64,
    pub high_noise_multiplier: f64,
    pub snapshot_motion: SnapshotMotion,
    /// Marker the reference board is centered on; lowest id when absent.
    pub reference_marker_id: Option<MarkerId>,
    /// Seed of the scene and noise generators; OS entropy when absent.
    pub seed: Option<u64>,
}

impl Default for AccuracyTestParams {
    fn default() -> Self {
        // Four detectors on a ring above the board, all aimed at the origin.
        let (radius, height) = (250.0, 350.0);
        let detectors = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)]
            .into_iter()
            .enumerate()
            .map(|(idx, (cx, cy))| {
                DetectorPlacement::new(
                    format!("detector_{idx}"),
                    [radius * cx, radius * cy, height],
                    [0.0, 0.0, 0.0],
                )
            })
            .collect();

        Self {
            scene_name: "planar_grid".to_string(),
            board_marker_size: 10.0,
            detector_intrinsics: DetectorIntrinsics {
                fx: 1000.0,
                fy: 1000.0,
                cx: 960.0,
                cy: 540.0,
                width: 1920,
                height: 1080,
            },
            detectors,
            snapshot_count: 10,
            noise_level: 0.5,
            low_noise_multiplier: 1.0,
            high_noise_multiplier: 1.5,
            snapshot_motion: SnapshotMotion::default(),
            reference_marker_id: None,
            seed: Some(0),
        }
    }
}

impl AccuracyTestParams {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ParamsIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ParamsIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn noise_spec(&self) -> Result<NoiseSpec, NoiseSpecError> {
        NoiseSpec::from_noise_level(
            self.noise_level,
            self.low_noise_multiplier,
            self.high_noise_multiplier,
        )
    }

    /// World poses of the configured detectors.
    pub fn detector_poses(&self) -> Vec<DetectorPose> {
        self.detectors.iter().map(DetectorPlacement::to_pose).collect()
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if !SCENE_NAMES.contains(&self.scene_name.as_str()) {
            return Err(ParamsError::UnknownScene(self.scene_name.clone()));
        }
        if !(self.board_marker_size.is_finite() && self.board_marker_size > 0.0) {
            return Err(ParamsError::InvalidMarkerSize(self.board_marker_size));
        }
        if self.snapshot_count == 0 {
            return Err(ParamsError::NoSnapshots);
        }
        if self.detectors.is_empty() {
            return Err(ParamsError::NoDetectors);
        }
        let k = &self.detector_intrinsics;
        if !(k.fx.is_finite() && k.fy.is_finite() && k.fx > 0.0 && k.fy > 0.0) {
            return Err(ParamsError::InvalidIntrinsics("focal lengths must be positive"));
        }
        if !(k.cx.is_finite() && k.cy.is_finite()) {
            return Err(ParamsError::InvalidIntrinsics("principal point must be finite"));
        }
        if k.width == 0 || k.height == 0 {
            return Err(ParamsError::InvalidIntrinsics("image size must be non-zero"));
        }
        let motion = &self.snapshot_motion;
        if !(0.0..=180.0).contains(&motion.max_rotation_deg) {
            return Err(ParamsError::InvalidMotion(
                "rotation must lie in [0, 180] degrees",
            ));
        }
        if !(0.0..=SnapshotMotion::TRANSLATION_LIMIT).contains(&motion.max_translation) {
            return Err(ParamsError::InvalidMotion(
                "translation must be finite and non-negative",
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for d in &self.detectors {
            if !seen.insert(d.detector_id.as_str()) {
                return Err(ParamsError::DuplicateDetector(d.detector_id.clone()));
            }
            if (Point3::from(d.eye) - Point3::from(d.target)).norm() < 1e-9 {
                return Err(ParamsError::DegeneratePlacement(d.detector_id.clone()));
            }
        }
        self.noise_spec()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = AccuracyTestParams::default();
        params.validate().expect("valid defaults");
        assert_eq!(params.detector_poses().len(), 4);
        assert_eq!(params.noise_spec().expect("noise").std_dev(), 0.25);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: AccuracyTestParams =
            serde_json::from_str(r#"{ "scene_name": "cube_faces", "noise_level": 1.0 }"#)
                .expect("parse");
        assert_eq!(params.scene_name, "cube_faces");
        assert_eq!(params.noise_level, 1.0);
        assert_eq!(params.detectors, AccuracyTestParams::default().detectors);
    }

    #[test]
    fn validation_reports_the_first_problem() {
        let mut p = AccuracyTestParams {
            scene_name: "nope".into(),
            ..Default::default()
        };
        assert_eq!(p.validate(), Err(ParamsError::UnknownScene("nope".into())));

        p.scene_name = "two_markers".into();
        p.snapshot_count = 0;
        assert_eq!(p.validate(), Err(ParamsError::NoSnapshots));

        p.snapshot_count = 1;
        p.detectors.push(p.detectors[0].clone());
        assert!(matches!(p.validate(), Err(ParamsError::DuplicateDetector(_))));

        p.detectors.pop();
        p.high_noise_multiplier = 0.5;
        assert!(matches!(p.validate(), Err(ParamsError::Noise(_))));
    }

    #[test]
    fn motion_bounds_must_be_sampleable() {
        let with_motion = |max_rotation_deg, max_translation| AccuracyTestParams {
            snapshot_motion: SnapshotMotion {
                max_rotation_deg,
                max_translation,
            },
            ..Default::default()
        };
        for (rot, shift) in [
            (0.0, 1e308),
            (0.0, f64::MAX / 2.0),
            (0.0, f64::INFINITY),
            (0.0, f64::NAN),
            (0.0, -1.0),
            (181.0, 0.0),
            (f64::NAN, 0.0),
            (-5.0, 0.0),
        ] {
            assert!(
                matches!(with_motion(rot, shift).validate(), Err(ParamsError::InvalidMotion(_))),
                "rotation {rot}, translation {shift}"
            );
        }
        with_motion(180.0, 1e6).validate().expect("large but finite motion");
        with_motion(0.0, 0.0).validate().expect("static scene");
    }

    #[test]
    fn principal_point_must_be_finite() {
        let mut p = AccuracyTestParams::default();
        p.detector_intrinsics.cx = f64::NAN;
        assert!(matches!(p.validate(), Err(ParamsError::InvalidIntrinsics(_))));
    }
}
