//! Flattened per-cell records the mesher consumes.
//!
//! A snapshot is taken from the authoritative generation of a [`SparseGrid`]
//! and owns everything the builder needs, so it can be moved to another thread
//! while the simulation keeps stepping.

use rill_voxel::{LiquidVoxel, SparseGrid, VoxelCoord};

use crate::face_direction::FaceDirection;

/// What a cell sees across one of its faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeighborFill {
    /// Air or an untracked non-solid cell.
    Open,
    /// A tracked liquid cell with this volume.
    Liquid(u8),
    /// Terrain reported solid by the world oracle.
    Solid,
}

impl NeighborFill {
    /// Volume a liquid neighbor holds; 0 for anything else.
    pub fn liquid_volume(self) -> u8 {
        match self {
            Self::Liquid(volume) => volume,
            Self::Open | Self::Solid => 0,
        }
    }
}

/// One liquid cell with its own state and the fill of its six neighbors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshableVoxel {
    pub position: VoxelCoord,
    pub id: i32,
    pub volume: u8,
    /// Indexed by [`FaceDirection::index`].
    pub neighbors: [NeighborFill; 6],
}

impl MeshableVoxel {
    /// Builds the record for a liquid cell at `position`, classifying each
    /// neighbor with `lookup`.
    pub fn new(
        position: VoxelCoord,
        voxel: LiquidVoxel,
        mut lookup: impl FnMut(VoxelCoord) -> NeighborFill,
    ) -> Self {
        let neighbors = FaceDirection::ALL.map(|dir| lookup(dir.offset(position)));
        Self {
            position,
            id: voxel.id(),
            volume: voxel.volume(),
            neighbors,
        }
    }

    pub fn neighbor(&self, direction: FaceDirection) -> NeighborFill {
        self.neighbors[direction.index()]
    }
}

/// Classifies the cell at `coord` using the grid's committed state and its
/// world oracle.
pub fn neighbor_fill(grid: &SparseGrid, coord: VoxelCoord) -> NeighborFill {
    if let Some(voxel) = grid.tracked(coord) {
        return NeighborFill::Liquid(voxel.volume());
    }
    if grid.query_world(coord).is_solid() {
        NeighborFill::Solid
    } else {
        NeighborFill::Open
    }
}

/// Flattens every tracked cell of `grid`, in lexicographic coordinate order.
pub fn snapshot(grid: &SparseGrid) -> Vec<MeshableVoxel> {
    grid.sorted_coords()
        .into_iter()
        .filter_map(|coord| {
            let voxel = grid.tracked(coord)?;
            Some(MeshableVoxel::new(coord, voxel, |n| neighbor_fill(grid, n)))
        })
        .collect()
}
