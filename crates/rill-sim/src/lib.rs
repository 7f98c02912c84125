//! The liquid cellular automaton: propagation steps, continuous sources, and
//! settle detection.

pub mod engine;
pub mod rng;
pub mod settle;
pub mod source;


pub use engine::{LiquidSim, SimError, StepOutcome};
pub use rng::{SimRng, sim_rng};
pub use settle::SettleTracker;
pub use source::{LiquidSource, SourcePlacement};
