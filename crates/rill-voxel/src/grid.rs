//! Double-buffered sparse storage for liquid cells.
//!
//! [`SparseGrid`] keeps two [`FxHashMap`]s keyed by [`VoxelCoord`]: the
//! authoritative `current` generation and the `next` generation being written by
//! a propagation step. Only liquid cells are stored; everything else is answered
//! by the injected [`WorldOracle`].
//!
//! While a step is running every read must go through [`SparseGrid::get`], which
//! consults `next`, then `current`, then the oracle. Reading `current` alone
//! would let a cell that is both a source and a destination in one generation be
//! counted twice.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::VoxelCoord;
use crate::oracle::WorldOracle;
use crate::voxel::{LiquidVoxel, MAX_VOLUME};

/// Errors returned when seeding liquid into the grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    /// The world reports solid terrain at the target cell.
    #[error("cannot place liquid inside solid terrain at {0}")]
    SolidTarget(VoxelCoord),
    /// The target cell already holds liquid.
    #[error("cell {0} already holds liquid")]
    Occupied(VoxelCoord),
    /// The voxel is not a liquid with a positive volume.
    #[error("only liquid with a positive volume can be placed (id {id}, volume {volume})")]
    NotLiquid {
        /// Rejected material id.
        id: i32,
        /// Rejected volume.
        volume: u8,
    },
}

/// Sparse liquid grid with a read buffer, a write buffer, and a world fallback.
pub struct SparseGrid {
    /// Authoritative generation.
    current: FxHashMap<VoxelCoord, LiquidVoxel>,
    /// Generation under construction. Air entries are tombstones for cells
    /// vacated during the step and never survive [`commit`](Self::commit).
    next: FxHashMap<VoxelCoord, LiquidVoxel>,
    oracle: Arc<dyn WorldOracle>,
}

impl SparseGrid {
    /// Creates an empty grid backed by `oracle` for untracked cells.
    pub fn new(oracle: Arc<dyn WorldOracle>) -> Self {
        Self {
            current: FxHashMap::default(),
            next: FxHashMap::default(),
            oracle,
        }
    }

    /// Merged lookup: staged value, then authoritative value, then the world.
    pub fn get(&self, coord: VoxelCoord) -> LiquidVoxel {
        if let Some(staged) = self.next.get(&coord) {
            return *staged;
        }
        if let Some(existing) = self.current.get(&coord) {
            return *existing;
        }
        self.query_world(coord)
    }

    /// Asks the oracle about an untracked cell.
    ///
    /// # Panics
    ///
    /// Panics if the oracle reports liquid; liquid is only ever tracked here.
    pub fn query_world(&self, coord: VoxelCoord) -> LiquidVoxel {
        let voxel = self.oracle.query(coord);
        assert!(
            !voxel.is_liquid(),
            "world oracle reported liquid (id {}) at untracked cell {coord}",
            voxel.id()
        );
        voxel
    }

    /// Authoritative value at `coord`, ignoring any in-progress step.
    pub fn tracked(&self, coord: VoxelCoord) -> Option<LiquidVoxel> {
        self.current.get(&coord).copied()
    }

    /// Overwrites the staged value at `coord`.
    ///
    /// A liquid with volume 0 is staged as a vacated cell.
    ///
    /// # Panics
    ///
    /// Panics when staging liquid into a cell the world reports as solid, or when
    /// staging a solid voxel.
    pub fn stage(&mut self, coord: VoxelCoord, voxel: LiquidVoxel) {
        assert!(
            !voxel.is_solid(),
            "solid voxel (id {}) staged into the liquid grid at {coord}",
            voxel.id()
        );
        if voxel.is_air() || voxel.volume() == 0 {
            self.vacate(coord);
            return;
        }
        let world = self.oracle.query(coord);
        assert!(
            !world.is_solid(),
            "liquid staged into solid terrain (id {}) at {coord}",
            world.id()
        );
        self.next.insert(coord, voxel);
    }

    /// Marks `coord` as empty for the remainder of the step.
    pub fn vacate(&mut self, coord: VoxelCoord) {
        self.next.insert(coord, LiquidVoxel::AIR);
    }

    /// Adds `extra` units of liquid `id` to whatever the merged view holds at
    /// `coord` and stages the result.
    ///
    /// The sum is clamped at [`MAX_VOLUME`]. The units that did not fit are
    /// discarded and returned so the caller can account for them; a non-zero
    /// overflow is also logged. An existing liquid keeps its own id.
    pub fn accumulate(&mut self, coord: VoxelCoord, id: i32, extra: u8) -> u8 {
        let base = self.get(coord);
        assert!(
            !base.is_solid(),
            "cannot accumulate liquid into solid terrain at {coord}"
        );
        let base = if base.is_air() {
            LiquidVoxel::new(id, 0)
        } else {
            base
        };

        let total = base.volume() as u16 + extra as u16;
        let stored = total.min(MAX_VOLUME as u16) as u8;
        let overflow = (total - stored as u16) as u8;

        self.stage(coord, base.with_volume(stored as i32));
        if overflow > 0 {
            warn!(
                "accumulate at {} overflowed: {} of {} units discarded",
                coord, overflow, extra
            );
        }
        overflow
    }

    /// Finishes a step: drops tombstones, swaps the buffers, and clears the new
    /// write buffer for reuse.
    pub fn commit(&mut self) {
        self.next.retain(|_, voxel| voxel.is_liquid());
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
    }

    /// Inserts liquid directly into the authoritative generation.
    ///
    /// Intended for seeding between steps.
    pub fn place(&mut self, coord: VoxelCoord, voxel: LiquidVoxel) -> Result<(), GridError> {
        debug_assert!(self.next.is_empty(), "place called during a step");
        if !voxel.is_liquid() || voxel.volume() == 0 {
            return Err(GridError::NotLiquid {
                id: voxel.id(),
                volume: voxel.volume(),
            });
        }
        if self.oracle.query(coord).is_solid() {
            return Err(GridError::SolidTarget(coord));
        }
        if self.current.contains_key(&coord) {
            return Err(GridError::Occupied(coord));
        }
        debug!(
            "placed liquid id={} volume={} at {}",
            voxel.id(),
            voxel.volume(),
            coord
        );
        self.current.insert(coord, voxel);
        Ok(())
    }

    /// Number of tracked liquid cells.
    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn contains(&self, coord: VoxelCoord) -> bool {
        self.current.contains_key(&coord)
    }

    /// Iterates the authoritative generation in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&VoxelCoord, &LiquidVoxel)> {
        self.current.iter()
    }

    /// Tracked coordinates in lexicographic order.
    pub fn sorted_coords(&self) -> Vec<VoxelCoord> {
        let mut coords: Vec<VoxelCoord> = self.current.keys().copied().collect();
        coords.sort_unstable();
        coords
    }

    /// Sum of all tracked volumes.
    pub fn total_volume(&self) -> u64 {
        self.current.values().map(|v| v.volume() as u64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::FlatWorld;

    fn grid() -> SparseGrid {
        SparseGrid::new(Arc::new(FlatWorld::default()))
    }

    fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
        VoxelCoord::new(x, y, z)
    }

    #[test]
    fn test_untracked_cells_come_from_oracle() {
        let g = grid();
        assert!(g.get(c(0, -1, 0)).is_solid());
        assert!(g.get(c(0, 0, 0)).is_air());
    }

    #[test]
    fn test_merged_lookup_prefers_write_buffer() {
        let mut g = grid();
        g.place(c(0, 1, 0), LiquidVoxel::new(1, 3)).unwrap();
        assert_eq!(g.get(c(0, 1, 0)).volume(), 3);

        g.stage(c(0, 1, 0), LiquidVoxel::new(1, 6));
        assert_eq!(g.get(c(0, 1, 0)).volume(), 6);
        // The authoritative view is untouched until commit.
        assert_eq!(g.tracked(c(0, 1, 0)).unwrap().volume(), 3);
    }

    #[test]
    fn test_vacated_cell_reads_as_air_until_commit() {
        let mut g = grid();
        g.place(c(2, 2, 2), LiquidVoxel::full(1)).unwrap();
        g.vacate(c(2, 2, 2));
        assert!(g.get(c(2, 2, 2)).is_air());
        assert!(g.contains(c(2, 2, 2)));

        g.commit();
        assert!(!g.contains(c(2, 2, 2)));
        assert!(g.is_empty());
    }

    #[test]
    fn test_commit_drops_unstaged_cells() {
        let mut g = grid();
        g.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        g.place(c(5, 0, 0), LiquidVoxel::full(1)).unwrap();
        g.stage(c(0, 0, 0), LiquidVoxel::full(1));
        g.commit();
        assert!(g.contains(c(0, 0, 0)));
        assert!(!g.contains(c(5, 0, 0)));
    }

    #[test]
    fn test_commit_clears_write_buffer() {
        let mut g = grid();
        g.stage(c(1, 1, 1), LiquidVoxel::new(1, 2));
        g.commit();
        // A second commit with nothing staged empties the grid.
        g.commit();
        assert!(g.is_empty());
    }

    #[test]
    fn test_staging_zero_volume_liquid_vacates() {
        let mut g = grid();
        g.place(c(0, 3, 0), LiquidVoxel::new(1, 4)).unwrap();
        g.stage(c(0, 3, 0), LiquidVoxel::new(1, 0));
        assert!(g.get(c(0, 3, 0)).is_air());
    }

    #[test]
    fn test_accumulate_merges_staged_volume() {
        let mut g = grid();
        assert_eq!(g.accumulate(c(0, 0, 0), 1, 3), 0);
        assert_eq!(g.accumulate(c(0, 0, 0), 1, 2), 0);
        assert_eq!(g.get(c(0, 0, 0)), LiquidVoxel::new(1, 5));
    }

    #[test]
    fn test_accumulate_reports_overflow() {
        let mut g = grid();
        g.place(c(0, 0, 0), LiquidVoxel::new(1, 5)).unwrap();
        let overflow = g.accumulate(c(0, 0, 0), 1, 4);
        assert_eq!(overflow, 2);
        assert_eq!(g.get(c(0, 0, 0)).volume(), MAX_VOLUME);
    }

    #[test]
    fn test_accumulate_keeps_existing_material() {
        let mut g = grid();
        g.place(c(0, 0, 0), LiquidVoxel::new(2, 1)).unwrap();
        g.accumulate(c(0, 0, 0), 1, 1);
        assert_eq!(g.get(c(0, 0, 0)).id(), 2);
    }

    #[test]
    fn test_place_rejects_solid_occupied_and_non_liquid() {
        let mut g = grid();
        assert_eq!(
            g.place(c(0, -1, 0), LiquidVoxel::full(1)),
            Err(GridError::SolidTarget(c(0, -1, 0)))
        );
        g.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        assert_eq!(
            g.place(c(0, 0, 0), LiquidVoxel::full(1)),
            Err(GridError::Occupied(c(0, 0, 0)))
        );
        assert!(matches!(
            g.place(c(1, 0, 0), LiquidVoxel::AIR),
            Err(GridError::NotLiquid { .. })
        ));
        assert!(matches!(
            g.place(c(1, 0, 0), LiquidVoxel::new(1, 0)),
            Err(GridError::NotLiquid { .. })
        ));
    }

    #[test]
    #[should_panic(expected = "liquid staged into solid terrain")]
    fn test_staging_into_solid_panics() {
        let mut g = grid();
        g.stage(c(0, -3, 0), LiquidVoxel::full(1));
    }

    #[test]
    #[should_panic(expected = "world oracle reported liquid")]
    fn test_oracle_reporting_liquid_panics() {
        let g = SparseGrid::new(Arc::new(|_: VoxelCoord| LiquidVoxel::full(1)));
        let _ = g.get(c(0, 0, 0));
    }

    #[test]
    fn test_sorted_coords_and_total_volume() {
        let mut g = grid();
        g.place(c(1, 0, 0), LiquidVoxel::new(1, 2)).unwrap();
        g.place(c(0, 4, 0), LiquidVoxel::new(1, 3)).unwrap();
        g.place(c(0, 1, 9), LiquidVoxel::new(1, 7)).unwrap();
        assert_eq!(
            g.sorted_coords(),
            vec![c(0, 1, 9), c(0, 4, 0), c(1, 0, 0)]
        );
        assert_eq!(g.total_volume(), 12);
        assert_eq!(g.len(), 3);
    }
}
