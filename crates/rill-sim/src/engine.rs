//! The propagation engine: one generation of the liquid cellular automaton.
//!
//! Every tracked cell is visited once per step in lexicographic coordinate
//! order. A cell first tries to fall into the cell below; if it cannot, a cell
//! holding more than one unit spreads to its four horizontal neighbors; if
//! neither succeeds it is carried over unchanged. All reads go through the
//! grid's merged view and all writes go to the write buffer, which becomes the
//! authoritative generation when the step commits.

use std::sync::Arc;

use rand::Rng;
use rill_config::{Config, ConfigError, SimConfig};
use rill_voxel::{FlatWorld, GridError, LiquidVoxel, MAX_VOLUME, SparseGrid, VoxelCoord, WorldOracle};
use thiserror::Error;
use tracing::{debug, info};

use crate::rng::{SimRng, sim_rng};
use crate::settle::SettleTracker;
use crate::source::LiquidSource;

/// Errors raised while building a simulation from configuration.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A configured seed cell could not be placed.
    #[error("invalid seed at {coord}: {source}")]
    Seed {
        coord: VoxelCoord,
        #[source]
        source: GridError,
    },
}

/// Summary of one propagation step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Anything moved, was injected, or was placed since the previous step.
    pub changed: bool,
    /// The liquid has been quiet for longer than the settle threshold.
    pub settled: bool,
    /// The source placed a new cell this step.
    pub injected: bool,
    /// Cells that moved volume downward.
    pub falls: usize,
    /// Cells that spread volume sideways.
    pub spreads: usize,
    /// Tracked cells after the step.
    pub tracked: usize,
    /// Total tracked volume after the step.
    pub total_volume: u64,
    /// Generation number of the committed state.
    pub generation: u64,
}

/// Liquid simulation state: the grid, the random source, and settle tracking.
pub struct LiquidSim<R: Rng = SimRng> {
    grid: SparseGrid,
    rng: R,
    source: Option<LiquidSource>,
    settle: SettleTracker,
    /// Set by external edits so the next step reports a change.
    pending_external: bool,
    generation: u64,
}

impl LiquidSim<SimRng> {
    /// Creates an empty simulation with the seeded default RNG.
    pub fn new(oracle: Arc<dyn WorldOracle>, config: &SimConfig) -> Self {
        Self::with_rng(oracle, sim_rng(config.rng_seed), config.settle_threshold)
    }

    /// Builds the simulation described by `config`: a flat world, the
    /// configured source, and every seed cell. The config is validated first.
    pub fn from_config(config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        let world = FlatWorld::new(config.world.ground_height, config.world.solid_id);
        let mut sim = Self::new(Arc::new(world), &config.sim);
        sim.set_source(LiquidSource::from_config(&config.source));
        for seed in &config.seeds {
            let coord = VoxelCoord::new(seed.x, seed.y, seed.z);
            sim.place(coord, LiquidVoxel::new(seed.id, seed.volume as i32))
                .map_err(|source| SimError::Seed { coord, source })?;
        }
        info!(
            "Liquid simulation ready: {} seed cells, {} units, source {}",
            sim.grid.len(),
            sim.grid.total_volume(),
            if sim.source.is_some() { "on" } else { "off" }
        );
        Ok(sim)
    }
}

impl<R: Rng> LiquidSim<R> {
    /// Creates an empty simulation drawing randomness from `rng`.
    pub fn with_rng(oracle: Arc<dyn WorldOracle>, rng: R, settle_threshold: f64) -> Self {
        Self {
            grid: SparseGrid::new(oracle),
            rng,
            source: None,
            settle: SettleTracker::new(settle_threshold),
            pending_external: false,
            generation: 0,
        }
    }

    /// The authoritative liquid state.
    pub fn grid(&self) -> &SparseGrid {
        &self.grid
    }

    /// Seeds liquid between steps. The next step reports a change.
    pub fn place(&mut self, coord: VoxelCoord, voxel: LiquidVoxel) -> Result<(), GridError> {
        self.grid.place(coord, voxel)?;
        self.pending_external = true;
        Ok(())
    }

    /// Installs or removes the continuous source.
    pub fn set_source(&mut self, source: Option<LiquidSource>) {
        self.source = source;
    }

    pub fn source(&self) -> Option<&LiquidSource> {
        self.source.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.settle.is_settled()
    }

    /// Whether stepping can still change anything. A settled grid with no
    /// source and no pending edit is a fixed point.
    pub fn needs_step(&self) -> bool {
        !self.settle.is_settled() || self.pending_external || self.source.is_some()
    }

    /// Number of committed generations.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advances the automaton by one generation at time `now` (seconds).
    pub fn step(&mut self, now: f64) -> StepOutcome {
        let mut outcome = StepOutcome {
            injected: self.inject(),
            ..StepOutcome::default()
        };
        let external = std::mem::take(&mut self.pending_external);

        for coord in self.grid.sorted_coords() {
            let source = self.grid.get(coord);
            assert!(
                source.is_liquid(),
                "tracked cell {coord} was emptied before it propagated"
            );

            if self.try_fall(coord, source) {
                outcome.falls += 1;
                continue;
            }
            if source.volume() > 1 {
                let offset = self.rng.random_range(0..4);
                if self.try_spread(coord, source, offset) {
                    outcome.spreads += 1;
                    continue;
                }
            }
            self.grid.stage(coord, source);
        }

        self.grid.commit();
        self.generation += 1;

        outcome.changed = external || outcome.injected || outcome.falls > 0 || outcome.spreads > 0;
        outcome.settled = self.settle.record(outcome.changed, now);
        outcome.tracked = self.grid.len();
        outcome.total_volume = self.grid.total_volume();
        outcome.generation = self.generation;

        debug!(
            generation = outcome.generation,
            falls = outcome.falls,
            spreads = outcome.spreads,
            injected = outcome.injected,
            tracked = outcome.tracked,
            volume = outcome.total_volume,
            settled = outcome.settled,
            "propagation step"
        );
        outcome
    }

    /// Lets the source place one full cell on an empty, non-solid target.
    fn inject(&mut self) -> bool {
        let Some(source) = self.source else {
            return false;
        };
        let Some(coord) = source.pick(&mut self.rng) else {
            return false;
        };
        match self.grid.place(coord, LiquidVoxel::full(source.liquid_id())) {
            Ok(()) => true,
            Err(e) => {
                debug!("source skipped: {e}");
                false
            }
        }
    }

    /// Moves as much of `source` as fits into the cell below.
    fn try_fall(&mut self, coord: VoxelCoord, source: LiquidVoxel) -> bool {
        let below_coord = coord.below();
        let below = self.grid.get(below_coord);

        if below.is_solid() {
            return false;
        }
        if below.is_air() {
            self.grid.stage(below_coord, source);
            self.grid.vacate(coord);
            return true;
        }

        let capacity = below.capacity();
        if capacity == 0 {
            return false;
        }
        let amount = capacity.min(source.volume()) as i32;
        self.grid.stage(below_coord, below.add_volume(amount));
        // A zero remainder vacates the source.
        self.grid.stage(coord, source.less_volume(amount));
        true
    }

    /// Levels `source` against its horizontal neighbors one unit at a time.
    ///
    /// `offset` picks which neighbor slot each pass starts from.
    fn try_spread(&mut self, coord: VoxelCoord, source: LiquidVoxel, offset: usize) -> bool {
        if source.volume() <= 1 {
            return false;
        }

        let positions = coord.lateral_neighbors();
        let mut neighbors = positions.map(|p| self.grid.get(p));
        let mut updated = [false; 4];

        let mut min_volume = neighbors
            .iter()
            .filter(|n| !n.is_solid())
            .map(|n| n.volume())
            .min()
            .unwrap_or(MAX_VOLUME);
        let mut remaining = source.volume();

        while remaining > min_volume {
            for i in 0..4 {
                if remaining <= min_volume || remaining == 1 {
                    break;
                }
                let slot = (i + offset) % 4;
                let neighbor = neighbors[slot];
                if neighbor.is_solid() || neighbor.volume() != min_volume {
                    continue;
                }
                neighbors[slot] = if neighbor.is_air() {
                    LiquidVoxel::new(source.id(), 1)
                } else {
                    neighbor.add_volume(1)
                };
                updated[slot] = true;
                remaining -= 1;
            }
            min_volume += 1;
        }

        if !updated.contains(&true) {
            return false;
        }
        for slot in 0..4 {
            if updated[slot] {
                self.grid.stage(positions[slot], neighbors[slot]);
            }
        }
        self.grid.stage(coord, source.with_volume(remaining as i32));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_config::SourceMode;
    use rill_voxel::STONE_ID;

    fn sim() -> LiquidSim {
        LiquidSim::with_rng(Arc::new(FlatWorld::default()), sim_rng(7), 1.0)
    }

    fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
        VoxelCoord::new(x, y, z)
    }

    #[test]
    fn test_fall_into_air_moves_whole_voxel() {
        let mut s = sim();
        s.place(c(0, 3, 0), LiquidVoxel::new(1, 5)).unwrap();
        let out = s.step(0.0);
        assert_eq!(out.falls, 1);
        assert!(!s.grid().contains(c(0, 3, 0)));
        assert_eq!(s.grid().tracked(c(0, 2, 0)), Some(LiquidVoxel::new(1, 5)));
    }

    #[test]
    fn test_fall_into_partial_liquid_leaves_remainder() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 5)).unwrap();
        s.place(c(0, 1, 0), LiquidVoxel::new(1, 4)).unwrap();
        assert!(s.try_fall(c(0, 1, 0), LiquidVoxel::new(1, 4)));
        assert_eq!(s.grid.get(c(0, 0, 0)).volume(), 7);
        assert_eq!(s.grid.get(c(0, 1, 0)).volume(), 2);
    }

    #[test]
    fn test_fall_that_empties_source_vacates_it() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 4)).unwrap();
        s.place(c(0, 1, 0), LiquidVoxel::new(1, 3)).unwrap();
        assert!(s.try_fall(c(0, 1, 0), LiquidVoxel::new(1, 3)));
        assert!(s.grid.get(c(0, 1, 0)).is_air());
        assert_eq!(s.grid.get(c(0, 0, 0)).volume(), 7);
    }

    #[test]
    fn test_fall_blocked_by_solid_and_full_liquid() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        s.place(c(0, 1, 0), LiquidVoxel::new(1, 2)).unwrap();
        assert!(!s.try_fall(c(0, 0, 0), LiquidVoxel::full(1)));
        assert!(!s.try_fall(c(0, 1, 0), LiquidVoxel::new(1, 2)));
    }

    #[test]
    fn test_lower_cell_keeps_its_material_when_filled() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(2, 3)).unwrap();
        assert!(s.try_fall(c(0, 1, 0), LiquidVoxel::new(1, 2)));
        assert_eq!(s.grid.get(c(0, 0, 0)), LiquidVoxel::new(2, 5));
    }

    #[test]
    fn test_spread_single_unit_never_moves() {
        let mut s = sim();
        assert!(!s.try_spread(c(0, 0, 0), LiquidVoxel::new(1, 1), 0));
    }

    #[test]
    fn test_spread_full_cell_into_open_floor() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        assert!(s.try_spread(c(0, 0, 0), LiquidVoxel::full(1), 0));

        // Offset 0: every neighbor gets one unit, then slots -X and +X get a
        // second one before the source drops to a single unit.
        assert_eq!(s.grid.get(c(0, 0, 0)).volume(), 1);
        assert_eq!(s.grid.get(c(-1, 0, 0)).volume(), 2);
        assert_eq!(s.grid.get(c(1, 0, 0)).volume(), 2);
        assert_eq!(s.grid.get(c(0, 0, 1)).volume(), 1);
        assert_eq!(s.grid.get(c(0, 0, -1)).volume(), 1);
    }

    #[test]
    fn test_spread_offset_rotates_second_pass() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        assert!(s.try_spread(c(0, 0, 0), LiquidVoxel::full(1), 2));
        // Offset 2 starts at +Z, so +Z and -Z receive the extra units.
        assert_eq!(s.grid.get(c(0, 0, 1)).volume(), 2);
        assert_eq!(s.grid.get(c(0, 0, -1)).volume(), 2);
        assert_eq!(s.grid.get(c(-1, 0, 0)).volume(), 1);
        assert_eq!(s.grid.get(c(1, 0, 0)).volume(), 1);
    }

    #[test]
    fn test_spread_new_cells_take_source_material() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(3, 2)).unwrap();
        assert!(s.try_spread(c(0, 0, 0), LiquidVoxel::new(3, 2), 1));
        assert_eq!(s.grid.get(c(1, 0, 0)), LiquidVoxel::new(3, 1));
        assert_eq!(s.grid.get(c(0, 0, 0)), LiquidVoxel::new(3, 1));
    }

    #[test]
    fn test_spread_skips_solid_neighbors() {
        // Walls on -X and +X.
        let walls = |p: VoxelCoord| {
            if p.y < 0 || p.x != 0 {
                LiquidVoxel::solid(STONE_ID)
            } else {
                LiquidVoxel::AIR
            }
        };
        let mut s = LiquidSim::with_rng(Arc::new(walls), sim_rng(1), 1.0);
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 5)).unwrap();
        assert!(s.try_spread(c(0, 0, 0), LiquidVoxel::new(1, 5), 0));
        assert!(s.grid.get(c(-1, 0, 0)).is_solid());
        assert!(s.grid.get(c(1, 0, 0)).is_solid());
        let total = s.grid.get(c(0, 0, 0)).volume()
            + s.grid.get(c(0, 0, 1)).volume()
            + s.grid.get(c(0, 0, -1)).volume();
        assert_eq!(total, 5);
        assert_eq!(s.grid.get(c(0, 0, 1)).volume(), 2);
        assert_eq!(s.grid.get(c(0, 0, -1)).volume(), 2);
    }

    #[test]
    fn test_spread_fully_enclosed_fails() {
        let tube = |p: VoxelCoord| {
            if p.y < 0 || p.x != 0 || p.z != 0 {
                LiquidVoxel::solid(STONE_ID)
            } else {
                LiquidVoxel::AIR
            }
        };
        let mut s = LiquidSim::with_rng(Arc::new(tube), sim_rng(1), 1.0);
        s.place(c(0, 0, 0), LiquidVoxel::full(1)).unwrap();
        assert!(!s.try_spread(c(0, 0, 0), LiquidVoxel::full(1), 3));
    }

    #[test]
    fn test_spread_stops_at_level_neighbors() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 3)).unwrap();
        for n in c(0, 0, 0).lateral_neighbors() {
            s.place(n, LiquidVoxel::new(1, 3)).unwrap();
        }
        assert!(!s.try_spread(c(0, 0, 0), LiquidVoxel::new(1, 3), 0));
    }

    #[test]
    fn test_unchanged_cells_survive_the_swap() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 1)).unwrap();
        s.step(0.0);
        let out = s.step(1.0);
        assert!(!out.changed);
        assert_eq!(s.grid().tracked(c(0, 0, 0)), Some(LiquidVoxel::new(1, 1)));
    }

    #[test]
    fn test_external_placement_counts_as_change() {
        let mut s = sim();
        s.place(c(0, 0, 0), LiquidVoxel::new(1, 1)).unwrap();
        let out = s.step(0.0);
        assert!(out.changed);
        assert_eq!(out.falls + out.spreads, 0);
    }

    #[test]
    fn test_from_config_places_seeds() {
        let mut config = Config::default();
        config.source.enabled = false;
        let s = LiquidSim::from_config(&config).unwrap();
        assert_eq!(s.grid().len(), 6);
        assert_eq!(s.grid().total_volume(), 23);
        assert!(s.source().is_none());
    }

    #[test]
    fn test_from_config_rejects_seed_in_ground() {
        let mut config = Config::default();
        config.seeds[0].y = -2;
        let err = LiquidSim::from_config(&config).err().unwrap();
        assert!(matches!(err, SimError::Seed { source: GridError::SolidTarget(_), .. }));
    }

    #[test]
    fn test_from_config_rejects_invalid_source() {
        let mut config = Config::default();
        config.source.probability = 1.5;
        let err = LiquidSim::from_config(&config).err().unwrap();
        assert!(matches!(
            err,
            SimError::Config(ConfigError::Invalid { field: "source.probability", .. })
        ));

        let mut config = Config::default();
        config.source.mode = SourceMode::RandomArea {
            min_x: 4,
            max_x: 4,
            min_z: 0,
            max_z: 10,
            y: 8,
        };
        let err = LiquidSim::from_config(&config).err().unwrap();
        assert!(matches!(err, SimError::Config(ConfigError::Invalid { field: "source.mode", .. })));
    }

    #[test]
    fn test_from_config_rejects_liquid_ground() {
        let mut config = Config::default();
        config.world.solid_id = 2;
        let err = LiquidSim::from_config(&config).err().unwrap();
        assert!(matches!(err, SimError::Config(ConfigError::Invalid { field: "world.solid_id", .. })));
    }
}
