//! Command-line argument parsing for the Rill runner.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Rill command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "rill", about = "Voxel liquid simulation")]
pub struct CliArgs {
    /// Number of frames to simulate.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Simulated seconds per frame.
    #[arg(long)]
    pub frame_dt: Option<f64>,

    /// Seconds between propagation steps.
    #[arg(long)]
    pub propagation_delay: Option<f64>,

    /// Seconds without change before the liquid counts as settled.
    #[arg(long)]
    pub settle_threshold: Option<f64>,

    /// RNG seed for spreading and injection.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Disable the continuous liquid source.
    #[arg(long)]
    pub no_source: bool,

    /// Build meshes inline instead of on the worker thread.
    #[arg(long)]
    pub inline_mesh: bool,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(frames) = args.frames {
            self.run.frames = frames;
        }
        if let Some(dt) = args.frame_dt {
            self.run.frame_dt = dt;
        }
        if let Some(delay) = args.propagation_delay {
            self.sim.propagation_delay = delay;
        }
        if let Some(threshold) = args.settle_threshold {
            self.sim.settle_threshold = threshold;
        }
        if let Some(seed) = args.seed {
            self.sim.rng_seed = seed;
        }
        if args.no_source {
            self.source.enabled = false;
        }
        if args.inline_mesh {
            self.mesh.background = false;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
