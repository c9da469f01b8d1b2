//! One accuracy run: simulate, reconstruct, compare.

use board_accuracy_builder::BoardBuilder;
use board_accuracy_core::{
    align_boards, board_rms_error, inject_corner_noise, snapshot_fidelity, AlignError,
    BoardAlignment, BoardError, BoardReconstructor, FidelityError, MetricError, NoiseSpecError,
    NoiseStats, SceneGenerator,
};
use board_accuracy_sim::{scene_by_name, RigidMotionScene, SceneError};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::{AccuracyTestParams, ParamsError};

/// Target id of the ground-truth board the reconstruction is compared with.
pub const REFERENCE_TARGET_ID: &str = "simulated_board";
/// Target id given to the reference builder's output.
pub const PREDICTED_TARGET_ID: &str = "predicted_board";

#[derive(thiserror::Error, Debug)]
pub enum AccuracyError {
    #[error("invalid parameters: {0}")]
    Params(#[from] ParamsError),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Noise(#[from] NoiseSpecError),
    #[error("snapshot fidelity: {0}")]
    Fidelity(#[from] FidelityError),
    #[error("reference board: {0}")]
    Board(#[from] BoardError),
    #[error("alignment: {0}")]
    Align(#[from] AlignError),
    #[error("rms: {0}")]
    Metric(#[from] MetricError),
}

/// Diagnostics of one run.
#[derive(Clone, Debug, Serialize)]
pub struct AccuracyReport {
    pub scene_name: String,
    /// Mean Frobenius discrepancy of snapshot relative transforms.
    pub snapshot_fidelity: f64,
    /// RMS corner error between the aligned reference and the prediction.
    pub rms_error: f64,
    pub snapshot_count: usize,
    /// Marker observations handed to the builder.
    pub observations: usize,
    pub noise: NoiseStats,
    pub alignment: BoardAlignment,
}

/// Accuracy run over a board builder `R` fed by a scene generator `S`.
///
/// The run consumes the test, so every run starts from a fresh builder.
pub struct AccuracyTest<R, S> {
    params: AccuracyTestParams,
    builder: R,
    scene: S,
    noise_rng: StdRng,
}

impl AccuracyTest<BoardBuilder, RigidMotionScene> {
    /// Run with the bundled homography builder and rigid-motion scene.
    ///
    /// The scene draws from `seed` and the noise from `seed + 1`, so a fixed
    /// seed yields the same snapshots at every noise level.
    pub fn with_reference_collaborators(params: AccuracyTestParams) -> Result<Self, AccuracyError> {
        let builder = BoardBuilder::new(PREDICTED_TARGET_ID, params.board_marker_size);
        let scene = RigidMotionScene::new(
            params.detector_intrinsics,
            params.snapshot_motion,
            params.seed,
        );
        Self::new(params, builder, scene)
    }
}

impl<R: BoardReconstructor, S: SceneGenerator> AccuracyTest<R, S> {
    pub fn new(params: AccuracyTestParams, builder: R, scene: S) -> Result<Self, AccuracyError> {
        params.validate()?;
        let noise_rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            params,
            builder,
            scene,
            noise_rng,
        })
    }

    #[inline]
    pub fn params(&self) -> &AccuracyTestParams {
        &self.params
    }

    /// Returns `Ok(None)` when the builder produced no usable board.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self),
            fields(scene = %self.params.scene_name, snapshots = self.params.snapshot_count)
        )
    )]
    pub fn run(mut self) -> Result<Option<AccuracyReport>, AccuracyError> {
        let params = &self.params;
        let definition = scene_by_name(&params.scene_name, params.board_marker_size)?;
        let noise = params.noise_spec()?;
        let poses = params.detector_poses();

        for pose in &poses {
            self.builder
                .set_intrinsic_parameters(&pose.detector_id, params.detector_intrinsics);
        }
        self.builder.set_detector_poses(&poses);

        let snapshots = self
            .scene
            .generate_virtual_snapshots(&definition.corners, params.snapshot_count);
        let fidelity = snapshot_fidelity(&definition.corners, &snapshots)?;
        info!("generated snapshots inaccuracy (mean Frobenius difference): {fidelity:e}");

        let mut noise_stats = NoiseStats::default();
        let mut observations = 0;
        for (idx, snapshot) in snapshots.iter().enumerate() {
            let clean = self.scene.generate_data(snapshot, &poses, true);
            let (noisy, stats) = inject_corner_noise(&clean, &noise, &mut self.noise_rng);
            let seen: usize = noisy.values().map(Vec::len).sum();
            debug!("snapshot {idx}: {seen} marker observations");
            observations += seen;
            noise_stats.merge(stats);
            self.builder.collect_data(&noisy);
        }
        if noise_stats.clamped > 0 {
            debug!(
                "{} of {} noise draws clamped",
                noise_stats.clamped, noise_stats.samples
            );
        }

        let predicted = self.builder.build_board();

        let reference_id = match params.reference_marker_id {
            Some(id) => id,
            None => match definition.corners.keys().next() {
                Some(&id) => id,
                None => {
                    warn!("scene '{}' has no markers", params.scene_name);
                    return Ok(None);
                }
            },
        };
        let reference = definition.recentered_board(REFERENCE_TARGET_ID, reference_id)?;

        let predicted = match predicted {
            Some(board) if !board.is_empty() && !reference.is_empty() => board,
            _ => {
                warn!("board builder produced no board; nothing to compare");
                return Ok(None);
            }
        };

        let alignment = align_boards(&predicted, &reference)?;
        let rms_error = board_rms_error(&alignment.aligned_reference, &predicted)?;
        info!("RMS error of board corners: {rms_error:e}");

        Ok(Some(AccuracyReport {
            scene_name: params.scene_name.clone(),
            snapshot_fidelity: fidelity,
            rms_error,
            snapshot_count: snapshots.len(),
            observations,
            noise: noise_stats,
            alignment,
        }))
    }
}
