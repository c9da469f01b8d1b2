//! Core types and evaluation routines for marker-board accuracy tests.
//!
//! This crate is purely geometric and statistical. It knows nothing about
//! how observations are simulated or how a board is reconstructed; both are
//! reached through the [`SceneGenerator`] and [`BoardReconstructor`] traits.
//!
//! The evaluation engine:
//! - [`inject_corner_noise`]: bounded Gaussian noise on 2D corner observations,
//! - [`marker_frame`] / [`relative_transform`]: rigid frames from planar marker corners,
//! - [`snapshot_fidelity`]: transform discrepancy between snapshots and ground truth,
//! - [`align_boards`]: rigid alignment of a reference board onto a reconstruction,
//! - [`rms_error`] / [`board_rms_error`]: point-wise RMS error.

mod align;
mod collaborator;
mod fidelity;
mod frame;
mod logger;
mod metrics;
mod noise;
mod types;

pub use align::{
    align_boards, register_corresponding_points, AlignError, BoardAlignment, RegistrationError,
};
pub use collaborator::{BoardReconstructor, DetectorIntrinsics, DetectorPose, SceneGenerator};
pub use fidelity::{snapshot_fidelity, FidelityError};
pub use frame::{invert_rigid, marker_frame, relative_transform, GeometryError, RelativeTransform};
pub use metrics::{board_rms_error, rms_error, MetricError};
pub use noise::{inject_corner_noise, NoiseSpec, NoiseSpecError, NoiseStats};
pub use types::{
    marker_corners_local, BoardDefinition, BoardError, CornerMap, CornerPoint,
    DetectorObservationSet, Marker, MarkerCorners, MarkerId, MarkerSnapshot, TargetBoard,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};
