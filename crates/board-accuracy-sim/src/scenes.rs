//! Named ground-truth boards.
//!
//! Every scene is built from marker poses through the shared local corner
//! model, so the winding is the same one the board builder expects.

use board_accuracy_core::BoardDefinition;
use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};

/// Scene names accepted by [`scene_by_name`].
pub const SCENE_NAMES: [&str; 3] = ["two_markers", "planar_grid", "cube_faces"];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("unknown scene '{0}' (expected one of: two_markers, planar_grid, cube_faces)")]
    UnknownScene(String),
    #[error("marker size must be positive and finite")]
    InvalidMarkerSize,
}

/// Look up a scene by name.
pub fn scene_by_name(name: &str, marker_size: f64) -> Result<BoardDefinition, SceneError> {
    if !(marker_size.is_finite() && marker_size > 0.0) {
        return Err(SceneError::InvalidMarkerSize);
    }
    match name {
        "two_markers" => Ok(two_markers(marker_size)),
        "planar_grid" => Ok(planar_grid(marker_size)),
        "cube_faces" => Ok(cube_faces(marker_size)),
        other => Err(SceneError::UnknownScene(other.to_string())),
    }
}

/// Two coplanar markers side by side, facing +z, one marker width apart.
pub fn two_markers(marker_size: f64) -> BoardDefinition {
    BoardDefinition::from_marker_poses(
        marker_size,
        [
            (0, Isometry3::translation(-marker_size, 0.0, 0.0)),
            (1, Isometry3::translation(marker_size, 0.0, 0.0)),
        ],
    )
}

/// 2 rows x 3 columns of coplanar markers facing +z, centered on the origin.
pub fn planar_grid(marker_size: f64) -> BoardDefinition {
    let pitch = 2.0 * marker_size;
    let poses = (0..2u32).flat_map(move |row| {
        (0..3u32).map(move |col| {
            let x = (col as f64 - 1.0) * pitch;
            let y = (0.5 - row as f64) * pitch;
            (row * 3 + col, Isometry3::translation(x, y, 0.0))
        })
    });
    BoardDefinition::from_marker_poses(marker_size, poses)
}

/// One marker on each face of a cube except the bottom (-z) one.
///
/// The cube edge is three marker widths; each marker faces outwards.
pub fn cube_faces(marker_size: f64) -> BoardDefinition {
    let half_edge = 1.5 * marker_size;
    let normals: [Vector3<f64>; 5] = [
        Vector3::z(),
        Vector3::x(),
        -Vector3::x(),
        Vector3::y(),
        -Vector3::y(),
    ];
    let poses = normals.into_iter().zip(0u32..).map(|(n, id)| {
        let up = if n.y.abs() > 0.5 {
            Vector3::z()
        } else {
            Vector3::y()
        };
        let rotation = UnitQuaternion::face_towards(&n, &up);
        let translation = Translation3::from(n * half_edge);
        (id, Isometry3::from_parts(translation, rotation))
    });
    BoardDefinition::from_marker_poses(marker_size, poses)
}
