//! Liquid voxel storage: exact-integer coordinates, volume-carrying voxels,
//! the world oracle capability, and the double-buffered sparse grid.

pub mod coord;
pub mod grid;
pub mod oracle;
pub mod voxel;

pub use coord::VoxelCoord;
pub use grid::{GridError, SparseGrid};
pub use oracle::{FlatWorld, WorldOracle};
pub use voxel::{AIR_ID, LiquidVoxel, MAX_VOLUME, STONE_ID};
