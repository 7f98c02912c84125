//! Frame-driven scheduling of propagation steps and mesh rebuilds.
//!
//! The host calls [`Scheduler::tick`] once per frame with the frame's elapsed
//! time. Frame time accumulates until a propagation delay has passed; then, if
//! no mesh build is still running and the liquid can still change, one step
//! runs and a rebuild is started for the new generation. Steps never overlap a
//! build, so every mesh reflects a completed step.

use rill_config::SimConfig;
use rill_mesh::MeshCounts;
use rill_sim::StepOutcome;
use tracing::{debug, info};

use crate::body::{BodyError, LiquidBody};

/// What happened during one [`Scheduler::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// The step that ran this frame, if any.
    pub stepped: Option<StepOutcome>,
    /// Counts of a background mesh collected this frame.
    pub mesh_ready: Option<MeshCounts>,
    /// A rebuild was started (or built inline) after the step.
    pub rebuild_started: bool,
}

pub struct Scheduler {
    propagation_delay: f64,
    accumulator: f64,
    sim_time: f64,
    frame_count: u64,
    step_count: u64,
    rebuild_count: u64,
    was_settled: bool,
}

impl Scheduler {
    pub fn new(propagation_delay: f64) -> Self {
        Self {
            propagation_delay,
            accumulator: 0.0,
            sim_time: 0.0,
            frame_count: 0,
            step_count: 0,
            rebuild_count: 0,
            was_settled: false,
        }
    }

    pub fn from_config(config: &SimConfig) -> Self {
        Self::new(config.propagation_delay)
    }

    /// Runs one frame of `frame_dt` seconds against `body`.
    pub fn tick(&mut self, frame_dt: f64, body: &mut LiquidBody) -> Result<TickReport, BodyError> {
        let mut report = TickReport::default();
        self.frame_count += 1;
        self.sim_time += frame_dt;
        self.accumulator += frame_dt;

        if body.mesh_in_flight() {
            report.mesh_ready = body.poll_mesh()?;
            if body.mesh_in_flight() {
                return Ok(report);
            }
        }

        if self.accumulator < self.propagation_delay {
            return Ok(report);
        }
        if !body.needs_step() {
            // Stay due so an edit or a new source steps on the next frame.
            self.accumulator = self.propagation_delay;
            return Ok(report);
        }

        self.accumulator = 0.0;
        let outcome = body.step(self.sim_time);
        self.step_count += 1;
        report.stepped = Some(outcome);

        if outcome.changed {
            report.rebuild_started = body.rebuild_async();
            if report.rebuild_started {
                self.rebuild_count += 1;
            }
        }

        if outcome.settled != self.was_settled {
            self.was_settled = outcome.settled;
            if outcome.settled {
                info!(
                    "Liquid settled after {} steps ({} cells, {} units)",
                    self.step_count, outcome.tracked, outcome.total_volume
                );
            } else {
                debug!("liquid woke at t={:.2}s", self.sim_time);
            }
        }
        Ok(report)
    }

    /// Seconds of simulated time fed in so far.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    pub fn propagation_delay(&self) -> f64 {
        self.propagation_delay
    }
}
