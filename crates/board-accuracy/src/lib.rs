//! Accuracy harness for marker board reconstruction.
//!
//! A run moves a known board through random rigid snapshots, projects it into
//! a ring of pinhole detectors, perturbs the corners with bounded Gaussian
//! noise and feeds the result to a board builder. The built board is then
//! compared with the ground truth. Two scalars come out of it:
//!
//! - `snapshot_fidelity`: how rigid the simulated snapshots are (should be ~0),
//! - `rms_error`: point-wise error of the reconstruction after rigid alignment.
//!
//! ## Quickstart
//!
//! ```
//! use board_accuracy::{AccuracyTest, AccuracyTestParams};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let params = AccuracyTestParams {
//!     scene_name: "two_markers".into(),
//!     snapshot_count: 3,
//!     ..Default::default()
//! };
//! let report = AccuracyTest::with_reference_collaborators(params)?.run()?;
//! if let Some(report) = report {
//!     println!("fidelity {:e}, rms {:.4}", report.snapshot_fidelity, report.rms_error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `board_accuracy::core`: data model, noise, frames, fidelity, alignment, RMS.
//! - `board_accuracy::sim`: scenes, projection, rigid-motion scene generator.
//! - `board_accuracy::builder`: homography-based board builder.
//! - [`AccuracyTest`]: the orchestrator; any `BoardReconstructor` and
//!   `SceneGenerator` pair can be plugged in.

pub use board_accuracy_builder as builder;
pub use board_accuracy_core as core;
pub use board_accuracy_sim as sim;

mod params;
mod run;

pub use params::{AccuracyTestParams, DetectorPlacement, ParamsError, ParamsIoError};
pub use run::{
    AccuracyError, AccuracyReport, AccuracyTest, PREDICTED_TARGET_ID, REFERENCE_TARGET_ID,
};
