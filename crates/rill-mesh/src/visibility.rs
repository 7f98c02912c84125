//! Face culling rules for liquid cells.
//!
//! A face is culled when the neighbor across it hides it completely:
//!
//! - Top: shown unless the cell is full and the cell above holds liquid.
//! - Bottom: shown unless the cell below is a full liquid cell.
//! - Sides: shown when the cell stands higher than its neighbor.
//!
//! Only liquid fill hides the top and bottom faces. How terrain hides a side
//! face is set by [`SolidFacePolicy`].

use rill_config::SolidFacePolicy;
use rill_voxel::MAX_VOLUME;

use crate::face_direction::FaceDirection;
use crate::meshable::{MeshableVoxel, NeighborFill};
use crate::visible_faces::VisibleFaces;

/// Fill level a side face is compared against.
pub fn effective_fill(fill: NeighborFill, policy: SolidFacePolicy) -> u8 {
    match fill {
        NeighborFill::Open => 0,
        NeighborFill::Liquid(volume) => volume,
        NeighborFill::Solid => match policy {
            SolidFacePolicy::Cull => MAX_VOLUME + 1,
            SolidFacePolicy::Expose => 0,
        },
    }
}

/// Computes the visible faces of one cell.
///
/// # Panics
///
/// Panics if the record is not a liquid cell with a volume in `1..=7`.
pub fn compute_visible_faces(voxel: &MeshableVoxel, policy: SolidFacePolicy) -> VisibleFaces {
    assert!(
        voxel.id > 0 && (1..=MAX_VOLUME).contains(&voxel.volume),
        "cell {} is not meshable liquid (id {}, volume {})",
        voxel.position,
        voxel.id,
        voxel.volume
    );

    let mut faces = VisibleFaces::NONE;

    let above = voxel.neighbor(FaceDirection::PosY).liquid_volume();
    if voxel.volume < MAX_VOLUME || above == 0 {
        faces.set_visible(FaceDirection::PosY);
    }

    if voxel.neighbor(FaceDirection::NegY) != NeighborFill::Liquid(MAX_VOLUME) {
        faces.set_visible(FaceDirection::NegY);
    }

    for dir in FaceDirection::SIDES {
        if voxel.volume > effective_fill(voxel.neighbor(dir), policy) {
            faces.set_visible(dir);
        }
    }

    faces
}
