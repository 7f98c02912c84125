//! Turns a snapshot of liquid cells into face quads.

use glam::Vec3;
use rill_config::SolidFacePolicy;
use rill_voxel::VoxelCoord;
use tracing::debug;

use crate::face_direction::FaceDirection;
use crate::liquid_mesh::{LiquidMeshBuffers, MeshCounts, fill_height};
use crate::meshable::MeshableVoxel;
use crate::visibility::compute_visible_faces;

/// Corners of one face of the cell at `position` filled to `volume`, wound
/// counter-clockwise when seen from outside.
///
/// Side faces span from the cell floor to the liquid surface.
pub fn face_corners(position: VoxelCoord, volume: u8, direction: FaceDirection) -> [Vec3; 4] {
    let base = Vec3::new(position.x as f32, position.y as f32, position.z as f32);
    let h = fill_height(volume);

    // Surface corners.
    let a = base + Vec3::new(1.0, h, 0.0);
    let b = base + Vec3::new(0.0, h, 0.0);
    let c = base + Vec3::new(0.0, h, 1.0);
    let d = base + Vec3::new(1.0, h, 1.0);
    // Floor corners.
    let e = base + Vec3::new(1.0, 0.0, 0.0);
    let f = base;
    let g = base + Vec3::new(0.0, 0.0, 1.0);
    let k = base + Vec3::new(1.0, 0.0, 1.0);

    match direction {
        FaceDirection::PosY => [a, b, c, d],
        FaceDirection::NegX => [g, c, b, f],
        FaceDirection::PosX => [a, d, k, e],
        FaceDirection::PosZ => [d, c, g, k],
        FaceDirection::NegZ => [b, a, e, f],
        FaceDirection::NegY => [g, f, e, k],
    }
}

/// Meshes `voxels` into `buffers`, replacing their previous contents.
///
/// Buffers are grown first if the snapshot holds more cells than they were
/// sized for. Faces are written per cell in [`FaceDirection::EMISSION_ORDER`].
pub fn build_mesh(
    voxels: &[MeshableVoxel],
    buffers: &mut LiquidMeshBuffers,
    policy: SolidFacePolicy,
) -> MeshCounts {
    buffers.ensure_capacity(voxels.len());
    buffers.reset();

    for voxel in voxels {
        let faces = compute_visible_faces(voxel, policy);
        for dir in faces.iter() {
            buffers.push_quad(face_corners(voxel.position, voxel.volume, dir), dir.normal());
        }
    }

    let counts = buffers.counts();
    debug!(
        cells = voxels.len(),
        quads = buffers.quad_count(),
        vertices = counts.vertices,
        "liquid mesh built"
    );
    counts
}
