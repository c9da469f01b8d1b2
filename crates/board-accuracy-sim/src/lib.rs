//! Synthetic scenes for marker-board accuracy tests.
//!
//! [`RigidMotionScene`] implements [`board_accuracy_core::SceneGenerator`]:
//! it moves a ground-truth board with random rigid motions and projects the
//! marker corners into pinhole detectors. [`scene_by_name`] returns one of
//! the bundled ground-truth boards.
//!
//! ```
//! use board_accuracy_core::{DetectorIntrinsics, SceneGenerator};
//! use board_accuracy_sim::{detector_looking_at, scene_by_name, RigidMotionScene, SnapshotMotion};
//! use nalgebra::Point3;
//!
//! let board = scene_by_name("planar_grid", 10.0).unwrap();
//! let intrinsics = DetectorIntrinsics { fx: 1000.0, fy: 1000.0, cx: 960.0, cy: 540.0, width: 1920, height: 1080 };
//! let mut scene = RigidMotionScene::new(intrinsics, SnapshotMotion::default(), Some(42));
//! let snapshots = scene.generate_virtual_snapshots(&board.corners, 2);
//! let camera = detector_looking_at("cam0", Point3::new(0.0, 0.0, 300.0), Point3::origin());
//! let observations = scene.generate_data(&snapshots[0], &[camera], true);
//! assert!(observations.contains_key("cam0"));
//! ```

mod camera;
mod scene;
mod scenes;

pub use camera::{detector_looking_at, project, project_marker, Visibility};
pub use scene::{RigidMotionScene, SnapshotMotion};
pub use scenes::{cube_faces, planar_grid, scene_by_name, two_markers, SceneError, SCENE_NAMES};
