//! Background meshing: runs [`build_mesh`] on a dedicated worker thread.
//!
//! A job owns its snapshot and the output buffers by value, so nothing on the
//! host side can read or resize the buffers while a build holds them. At most
//! one job is in flight; the buffers come back with the result.

use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use rill_config::SolidFacePolicy;
use thiserror::Error;
use tracing::{debug, error};

use crate::builder::build_mesh;
use crate::liquid_mesh::{LiquidMeshBuffers, MeshCounts};
use crate::meshable::MeshableVoxel;

/// A self-contained mesh build.
#[derive(Debug)]
pub struct MeshJob {
    /// Simulation generation the snapshot was taken at.
    pub generation: u64,
    pub voxels: Vec<MeshableVoxel>,
    pub buffers: LiquidMeshBuffers,
    pub policy: SolidFacePolicy,
}

/// A finished build with the buffers it filled.
#[derive(Debug)]
pub struct MeshResult {
    pub generation: u64,
    pub buffers: LiquidMeshBuffers,
    pub counts: MeshCounts,
}

#[derive(Debug, Error)]
pub enum MeshingError {
    /// A build is already running; the rejected job is handed back.
    #[error("a mesh build is already in flight")]
    Busy(Box<MeshJob>),
    /// The worker has stopped; the rejected job is handed back.
    #[error("the meshing worker has shut down")]
    Disconnected(Box<MeshJob>),
    /// The worker stopped while holding a job, taking its buffers with it.
    #[error("the meshing worker exited without returning its buffers")]
    WorkerLost,
}

impl MeshingError {
    /// Recovers the rejected job, if the error carries one.
    pub fn into_job(self) -> Option<MeshJob> {
        match self {
            Self::Busy(job) | Self::Disconnected(job) => Some(*job),
            Self::WorkerLost => None,
        }
    }
}

/// Single-worker meshing pipeline.
pub struct MeshingPipeline {
    job_sender: Option<Sender<MeshJob>>,
    result_receiver: Receiver<MeshResult>,
    worker: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl MeshingPipeline {
    /// Spawns the worker thread.
    pub fn new() -> Self {
        let (job_tx, job_rx) = crossbeam_channel::bounded::<MeshJob>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);

        let worker = std::thread::spawn(move || {
            while let Ok(mut job) = job_rx.recv() {
                let counts = build_mesh(&job.voxels, &mut job.buffers, job.policy);
                let result = MeshResult {
                    generation: job.generation,
                    buffers: job.buffers,
                    counts,
                };
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            job_sender: Some(job_tx),
            result_receiver: result_rx,
            worker: Some(worker),
            in_flight: false,
        }
    }

    /// Hands `job` to the worker.
    pub fn submit(&mut self, job: MeshJob) -> Result<(), MeshingError> {
        if self.in_flight {
            return Err(MeshingError::Busy(Box::new(job)));
        }
        let Some(sender) = &self.job_sender else {
            return Err(MeshingError::Disconnected(Box::new(job)));
        };
        let generation = job.generation;
        sender
            .send(job)
            .map_err(|e| MeshingError::Disconnected(Box::new(e.into_inner())))?;
        self.in_flight = true;
        debug!("submitted mesh build for generation {generation}");
        Ok(())
    }

    /// Returns the finished build if there is one, without blocking.
    pub fn try_recv(&mut self) -> Result<Option<MeshResult>, MeshingError> {
        if !self.in_flight {
            return Ok(None);
        }
        match self.result_receiver.try_recv() {
            Ok(result) => {
                self.in_flight = false;
                Ok(Some(result))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => self.lost(),
        }
    }

    /// Blocks until the in-flight build finishes. Returns `None` when idle.
    pub fn wait(&mut self) -> Result<Option<MeshResult>, MeshingError> {
        if !self.in_flight {
            return Ok(None);
        }
        match self.result_receiver.recv() {
            Ok(result) => {
                self.in_flight = false;
                Ok(Some(result))
            }
            Err(_) => self.lost(),
        }
    }

    /// A build has been submitted and not yet collected.
    pub fn is_busy(&self) -> bool {
        self.in_flight
    }

    /// Stops the worker and joins it. Pending jobs finish first.
    pub fn shutdown(&mut self) {
        self.job_sender.take();
        if let Some(Err(_)) = self.worker.take().map(JoinHandle::join) {
            error!("meshing worker panicked");
        }
    }

    fn lost(&mut self) -> Result<Option<MeshResult>, MeshingError> {
        self.in_flight = false;
        error!("meshing worker exited with a build in flight");
        Err(MeshingError::WorkerLost)
    }
}

impl Default for MeshingPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MeshingPipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}
