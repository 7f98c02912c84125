//! The "ask the world" capability consulted for cells outside the tracked set.

use crate::coord::VoxelCoord;
use crate::voxel::{LiquidVoxel, STONE_ID};

/// Answers what occupies a cell the liquid grid does not track.
///
/// Implementations must be pure functions of the coordinate and may only
/// report air or solid cells; liquid lives exclusively in the grid.
pub trait WorldOracle: Send + Sync {
    /// Returns the voxel at `coord`.
    fn query(&self, coord: VoxelCoord) -> LiquidVoxel;
}

impl<F> WorldOracle for F
where
    F: Fn(VoxelCoord) -> LiquidVoxel + Send + Sync,
{
    fn query(&self, coord: VoxelCoord) -> LiquidVoxel {
        self(coord)
    }
}

/// A world that is solid below a horizontal ground plane and air above it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatWorld {
    /// Cells with `y < ground_height` are solid.
    pub ground_height: i32,
    /// Material id reported for ground cells (negative).
    pub solid_id: i32,
}

impl FlatWorld {
    pub fn new(ground_height: i32, solid_id: i32) -> Self {
        assert!(solid_id < 0, "ground material must be solid, got id {solid_id}");
        Self {
            ground_height,
            solid_id,
        }
    }
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self::new(0, STONE_ID)
    }
}

impl WorldOracle for FlatWorld {
    fn query(&self, coord: VoxelCoord) -> LiquidVoxel {
        if coord.y < self.ground_height {
            LiquidVoxel::solid(self.solid_id)
        } else {
            LiquidVoxel::AIR
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_world_default_ground_plane() {
        let world = FlatWorld::default();
        assert!(world.query(VoxelCoord::new(0, -1, 0)).is_solid());
        assert!(world.query(VoxelCoord::new(0, 0, 0)).is_air());
        assert!(world.query(VoxelCoord::new(50, 9, -3)).is_air());
    }

    #[test]
    fn test_flat_world_custom_height() {
        let world = FlatWorld::new(4, -7);
        let below = world.query(VoxelCoord::new(0, 3, 0));
        assert!(below.is_solid());
        assert_eq!(below.id(), -7);
        assert!(world.query(VoxelCoord::new(0, 4, 0)).is_air());
    }

    #[test]
    fn test_closure_is_an_oracle() {
        let pillar = |c: VoxelCoord| {
            if c.x == 0 && c.z == 0 {
                LiquidVoxel::solid(STONE_ID)
            } else {
                LiquidVoxel::AIR
            }
        };
        assert!(pillar.query(VoxelCoord::new(0, 100, 0)).is_solid());
        assert!(pillar.query(VoxelCoord::new(1, 0, 0)).is_air());
    }

    #[test]
    #[should_panic(expected = "ground material must be solid")]
    fn test_flat_world_rejects_non_solid_id() {
        let _ = FlatWorld::new(0, 1);
    }
}
