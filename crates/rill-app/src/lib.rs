//! Host-side driver for a liquid body: the [`LiquidBody`] facade pairing the
//! simulation with its mesh, and the frame [`Scheduler`].

pub mod body;
pub mod scheduler;

pub use body::{BodyError, LiquidBody};
pub use scheduler::{Scheduler, TickReport};
