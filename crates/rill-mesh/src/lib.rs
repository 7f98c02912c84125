//! Liquid surface meshing: face culling against neighbor fill levels, reusable
//! output buffers, and a background meshing worker.

pub mod async_mesh;
pub mod builder;
pub mod face_direction;
pub mod liquid_mesh;
pub mod meshable;
pub mod visibility;
pub mod visible_faces;


pub use async_mesh::{MeshJob, MeshResult, MeshingError, MeshingPipeline};
pub use builder::{build_mesh, face_corners};
pub use face_direction::FaceDirection;
pub use liquid_mesh::{
    FILL_HEIGHTS, INDICES_PER_CELL, LiquidMeshBuffers, LiquidVertex, MeshCounts,
    VERTICES_PER_CELL, fill_height,
};
pub use meshable::{MeshableVoxel, NeighborFill, neighbor_fill, snapshot};
pub use visibility::{compute_visible_faces, effective_fill};
pub use visible_faces::VisibleFaces;
