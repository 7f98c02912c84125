//! Headless runner: loads the config, simulates a liquid body for a number of
//! frames, and reports what it did.

use clap::Parser;
use rill_app::{BodyError, LiquidBody, Scheduler};
use rill_config::{CliArgs, Config};
use tracing::{error, info};

fn main() {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().or_else(Config::default_dir);
    let mut config = match &config_dir {
        Some(dir) => Config::load_or_create(dir).unwrap_or_else(|e| {
            eprintln!("Failed to load config: {e}, using defaults");
            Config::default()
        }),
        None => Config::default(),
    };
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.as_ref().map(|dir| dir.join("logs"));
    rill_log::init_logging(log_dir.as_deref(), cfg!(debug_assertions), Some(&config));

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(&config) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(config: &Config) -> Result<(), BodyError> {
    let mut body = LiquidBody::from_config(config)?;
    let mut scheduler = Scheduler::from_config(&config.sim);

    info!(
        "Running {} frames of {:.4}s, one step every {:.2}s",
        config.run.frames, config.run.frame_dt, config.sim.propagation_delay
    );

    let mut quads_built = 0usize;
    for _ in 0..config.run.frames {
        let report = scheduler.tick(config.run.frame_dt, &mut body)?;
        if let Some(counts) = report.mesh_ready {
            quads_built += counts.indices / 6;
        }
    }
    if let Some(counts) = body.wait_mesh()? {
        quads_built += counts.indices / 6;
    }

    let mesh = body.rebuild();
    let counts = mesh.counts();
    info!(
        "Final mesh: {} quads, {} vertices, {} indices (capacity {} cells)",
        mesh.quad_count(),
        counts.vertices,
        counts.indices,
        mesh.capacity()
    );

    let grid = body.grid();
    info!(
        "Simulated {:.1}s: {} steps, {} rebuilds ({} quads meshed in the background), {} cells holding {} units, {}",
        scheduler.sim_time(),
        scheduler.step_count(),
        scheduler.rebuild_count(),
        quads_built,
        grid.len(),
        grid.total_volume(),
        if body.is_settled() { "settled" } else { "still flowing" }
    );
    Ok(())
}
