use approx::{assert_abs_diff_eq, assert_relative_eq};
use board_accuracy::sim::SnapshotMotion;
use board_accuracy::{AccuracyTest, AccuracyTestParams, DetectorPlacement};

fn single_detector_params() -> AccuracyTestParams {
    AccuracyTestParams {
        scene_name: "two_markers".into(),
        detectors: vec![DetectorPlacement::new(
            "top",
            [0.0, 0.0, 300.0],
            [0.0, 0.0, 0.0],
        )],
        snapshot_count: 1,
        noise_level: 0.0,
        snapshot_motion: SnapshotMotion::none(),
        seed: Some(11),
        ..Default::default()
    }
}

fn mean_rms(noise_level: f64, seeds: std::ops::Range<u64>) -> f64 {
    let runs = seeds.clone().count() as f64;
    seeds
        .map(|seed| {
            let params = AccuracyTestParams {
                scene_name: "planar_grid".into(),
                snapshot_count: 5,
                noise_level,
                seed: Some(seed),
                ..Default::default()
            };
            AccuracyTest::with_reference_collaborators(params)
                .expect("params")
                .run()
                .expect("run")
                .expect("board")
                .rms_error
        })
        .sum::<f64>()
        / runs
}

#[test]
fn noiseless_static_scene_is_reconstructed_exactly() {
    let report = AccuracyTest::with_reference_collaborators(single_detector_params())
        .expect("params")
        .run()
        .expect("run")
        .expect("board");

    assert_eq!(report.snapshot_fidelity, 0.0);
    assert_abs_diff_eq!(report.rms_error, 0.0, epsilon = 1e-6);
    assert_eq!(report.snapshot_count, 1);
    assert_eq!(report.observations, 2);
    assert_eq!(report.noise.clamped, 0);
    assert_eq!(report.alignment.aligned_reference.marker_ids(), vec![0, 1]);
}

#[test]
fn reconstruction_error_grows_with_noise() {
    let clean = mean_rms(0.0, 0..4);
    let mild = mean_rms(0.5, 0..4);
    let strong = mean_rms(2.0, 0..4);
    assert_abs_diff_eq!(clean, 0.0, epsilon = 1e-6);
    assert!(clean <= mild, "clean = {clean}, mild = {mild}");
    assert!(mild <= strong, "mild = {mild}, strong = {strong}");
}

#[test]
fn same_seed_reproduces_the_report() {
    let params = AccuracyTestParams {
        scene_name: "cube_faces".into(),
        snapshot_count: 4,
        seed: Some(5),
        ..Default::default()
    };
    let run = || {
        AccuracyTest::with_reference_collaborators(params.clone())
            .expect("params")
            .run()
            .expect("run")
    };
    match (run(), run()) {
        (Some(a), Some(b)) => {
            assert_relative_eq!(a.rms_error, b.rms_error, max_relative = 1e-12);
            assert_relative_eq!(
                a.snapshot_fidelity,
                b.snapshot_fidelity,
                max_relative = 1e-12
            );
            assert_eq!(a.noise, b.noise);
        }
        (None, None) => {}
        _ => panic!("runs with the same seed diverged"),
    }
}

#[test]
fn params_round_trip_through_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("params.json");

    let params = single_detector_params();
    params.write_json(&path).expect("write");
    let loaded = AccuracyTestParams::load_json(&path).expect("load");
    assert_eq!(loaded, params);

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(raw["scene_name"], "two_markers");
    assert_eq!(raw["detectors"][0]["detector_id"], "top");
}

#[test]
fn missing_config_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = AccuracyTestParams::load_json(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, board_accuracy::ParamsIoError::Io(_)));
}
