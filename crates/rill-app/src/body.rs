//! [`LiquidBody`]: one simulated body of liquid together with its mesh.

use rill_config::{Config, MeshConfig, SolidFacePolicy};
use rill_mesh::{
    LiquidMeshBuffers, MeshCounts, MeshJob, MeshResult, MeshingError, MeshingPipeline, build_mesh,
    snapshot,
};
use rill_sim::{LiquidSim, LiquidSource, SimError, StepOutcome};
use rill_voxel::{GridError, LiquidVoxel, SparseGrid, VoxelCoord};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to set up the simulation: {0}")]
    Setup(#[from] SimError),
    #[error(transparent)]
    Placement(#[from] GridError),
    #[error(transparent)]
    Meshing(#[from] MeshingError),
}

/// A liquid simulation and the buffers its surface is meshed into.
///
/// With background meshing the buffers travel to the worker with each build
/// and are absent until the build is collected.
pub struct LiquidBody {
    sim: LiquidSim,
    buffers: Option<LiquidMeshBuffers>,
    mesh_config: MeshConfig,
    pipeline: Option<MeshingPipeline>,
    /// Generation of the last collected mesh.
    mesh_generation: Option<u64>,
}

impl LiquidBody {
    /// Wraps `sim`, meshing on a worker thread when `mesh.background` is set.
    pub fn new(sim: LiquidSim, mesh: &MeshConfig) -> Self {
        Self {
            sim,
            buffers: Some(LiquidMeshBuffers::from_config(mesh)),
            mesh_config: mesh.clone(),
            pipeline: mesh.background.then(MeshingPipeline::new),
            mesh_generation: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, BodyError> {
        let sim = LiquidSim::from_config(config)?;
        let body = Self::new(sim, &config.mesh);
        info!(
            "Liquid body ready ({} meshing, {:?} solid faces)",
            if body.pipeline.is_some() { "background" } else { "inline" },
            body.mesh_config.solid_faces
        );
        Ok(body)
    }

    pub fn sim(&self) -> &LiquidSim {
        &self.sim
    }

    pub fn grid(&self) -> &SparseGrid {
        self.sim.grid()
    }

    pub fn policy(&self) -> SolidFacePolicy {
        self.mesh_config.solid_faces
    }

    /// Advances the liquid one generation at time `now`.
    pub fn step(&mut self, now: f64) -> StepOutcome {
        self.sim.step(now)
    }

    pub fn needs_step(&self) -> bool {
        self.sim.needs_step()
    }

    pub fn is_settled(&self) -> bool {
        self.sim.is_settled()
    }

    /// Seeds `volume` units of liquid `id` at `coord`.
    pub fn place(&mut self, coord: VoxelCoord, id: i32, volume: i32) -> Result<(), BodyError> {
        self.sim.place(coord, LiquidVoxel::new(id, volume))?;
        Ok(())
    }

    pub fn set_source(&mut self, source: Option<LiquidSource>) {
        self.sim.set_source(source);
    }

    /// Meshes the current generation on this thread, first collecting any
    /// build still running in the background.
    pub fn rebuild(&mut self) -> &LiquidMeshBuffers {
        if let Err(e) = self.wait_mesh() {
            error!("discarding background mesh: {e}");
        }
        let voxels = snapshot(self.sim.grid());
        let buffers = self
            .buffers
            .get_or_insert_with(|| LiquidMeshBuffers::from_config(&self.mesh_config));
        build_mesh(&voxels, buffers, self.mesh_config.solid_faces);
        self.mesh_generation = Some(self.sim.generation());
        buffers
    }

    /// Starts meshing the current generation in the background.
    ///
    /// Returns `false` if a build is already in flight. Without a worker the
    /// mesh is built inline and this returns `true`.
    pub fn rebuild_async(&mut self) -> bool {
        if self.pipeline.is_none() {
            self.rebuild();
            return true;
        }
        let Some(pipeline) = self.pipeline.as_mut() else {
            return false;
        };
        if pipeline.is_busy() {
            return false;
        }
        let Some(buffers) = self.buffers.take() else {
            return false;
        };

        let job = MeshJob {
            generation: self.sim.generation(),
            voxels: snapshot(self.sim.grid()),
            buffers,
            policy: self.mesh_config.solid_faces,
        };
        match pipeline.submit(job) {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}, meshing inline from now on");
                if let Some(job) = e.into_job() {
                    self.buffers = Some(job.buffers);
                }
                self.pipeline = None;
                self.rebuild();
                true
            }
        }
    }

    /// Collects a finished background build without blocking.
    pub fn poll_mesh(&mut self) -> Result<Option<MeshCounts>, BodyError> {
        let polled = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.try_recv(),
            None => Ok(None),
        };
        self.collect(polled)
    }

    /// Blocks until the in-flight build, if any, is collected.
    pub fn wait_mesh(&mut self) -> Result<Option<MeshCounts>, BodyError> {
        let waited = match self.pipeline.as_mut() {
            Some(pipeline) => pipeline.wait(),
            None => Ok(None),
        };
        self.collect(waited)
    }

    pub fn mesh_in_flight(&self) -> bool {
        self.pipeline.as_ref().is_some_and(MeshingPipeline::is_busy)
    }

    /// The last collected mesh; `None` while a build holds the buffers.
    pub fn mesh(&self) -> Option<&LiquidMeshBuffers> {
        self.buffers.as_ref()
    }

    /// Generation the last collected mesh was built from.
    pub fn mesh_generation(&self) -> Option<u64> {
        self.mesh_generation
    }

    fn collect(
        &mut self,
        received: Result<Option<MeshResult>, MeshingError>,
    ) -> Result<Option<MeshCounts>, BodyError> {
        match received {
            Ok(Some(result)) => {
                self.buffers = Some(result.buffers);
                self.mesh_generation = Some(result.generation);
                Ok(Some(result.counts))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                // The buffers went down with the worker.
                self.pipeline = None;
                self.buffers = Some(LiquidMeshBuffers::from_config(&self.mesh_config));
                Err(e.into())
            }
        }
    }
}
