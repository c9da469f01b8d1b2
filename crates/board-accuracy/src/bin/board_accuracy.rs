use std::path::PathBuf;
use std::process::ExitCode;

use board_accuracy::{AccuracyTest, AccuracyTestParams};
use clap::Parser;

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

/// Measure how accurately the reference board builder reconstructs a
/// simulated marker board.
#[derive(Parser, Debug)]
#[command(name = "board-accuracy", version)]
struct Cli {
    /// JSON parameters file; defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scene to simulate (two_markers, planar_grid, cube_faces).
    #[arg(long)]
    scene: Option<String>,

    /// Number of snapshots.
    #[arg(long)]
    snapshots: Option<usize>,

    /// Nominal corner noise in pixels.
    #[arg(long)]
    noise: Option<f64>,

    /// Seed of the scene and noise generators.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective parameters to this path before running.
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Print the full report as JSON instead of the two diagnostics.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn params(&self) -> Result<AccuracyTestParams, Box<dyn std::error::Error>> {
        let mut params = match &self.config {
            Some(path) => AccuracyTestParams::load_json(path)?,
            None => AccuracyTestParams::default(),
        };
        if let Some(scene) = &self.scene {
            params.scene_name = scene.clone();
        }
        if let Some(n) = self.snapshots {
            params.snapshot_count = n;
        }
        if let Some(noise) = self.noise {
            params.noise_level = noise;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        Ok(params)
    }
}

fn init_logging(verbose: u8) {
    let level = board_accuracy::core::level_from_verbosity(verbose);
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        board_accuracy::core::init_tracing(false, level);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = board_accuracy::core::init_with_level(level);
    }
}

fn run(cli: &Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let params = cli.params()?;
    if let Some(path) = &cli.write_config {
        params.write_json(path)?;
        log::info!("wrote parameters to {}", path.display());
    }

    let Some(report) = AccuracyTest::with_reference_collaborators(params)?.run()? else {
        return Ok(false);
    };
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("snapshot fidelity: {:e}", report.snapshot_fidelity);
        println!("rms error: {:.6}", report.rms_error);
    }
    Ok(true)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("no board was built; nothing to compare");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
