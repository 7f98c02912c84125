//! Continuous liquid injection.

use rand::Rng;
use rill_config::{SourceConfig, SourceMode};
use rill_voxel::VoxelCoord;

/// Where a [`LiquidSource`] drops new cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourcePlacement {
    /// Always the same cell.
    Fixed(VoxelCoord),
    /// A uniformly random cell of the half-open rectangle
    /// `[min_x, max_x) × [min_z, max_z)` at height `y`.
    RandomArea {
        min_x: i32,
        max_x: i32,
        min_z: i32,
        max_z: i32,
        y: i32,
    },
}

/// Places one full liquid cell per step with a fixed probability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LiquidSource {
    placement: SourcePlacement,
    probability: f64,
    liquid_id: i32,
}

impl LiquidSource {
    /// Creates a source.
    ///
    /// # Panics
    ///
    /// Panics if `probability` is outside `0.0..=1.0`, `liquid_id` is not
    /// positive, or a random area is empty.
    pub fn new(placement: SourcePlacement, probability: f64, liquid_id: i32) -> Self {
        assert!(
            (0.0..=1.0).contains(&probability),
            "source probability {probability} outside 0.0..=1.0"
        );
        assert!(liquid_id > 0, "source liquid id must be positive, got {liquid_id}");
        if let SourcePlacement::RandomArea {
            min_x,
            max_x,
            min_z,
            max_z,
            ..
        } = placement
        {
            assert!(min_x < max_x && min_z < max_z, "source area is empty");
        }
        Self {
            placement,
            probability,
            liquid_id,
        }
    }

    /// A source that fires every step at `coord`.
    pub fn fixed(coord: VoxelCoord, liquid_id: i32) -> Self {
        Self::new(SourcePlacement::Fixed(coord), 1.0, liquid_id)
    }

    /// Builds the configured source, or `None` when it is disabled.
    pub fn from_config(config: &SourceConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }
        let placement = match config.mode {
            SourceMode::Fixed { x, y, z } => SourcePlacement::Fixed(VoxelCoord::new(x, y, z)),
            SourceMode::RandomArea {
                min_x,
                max_x,
                min_z,
                max_z,
                y,
            } => SourcePlacement::RandomArea {
                min_x,
                max_x,
                min_z,
                max_z,
                y,
            },
        };
        Some(Self::new(placement, config.probability, config.liquid_id))
    }

    pub fn liquid_id(&self) -> i32 {
        self.liquid_id
    }

    pub fn placement(&self) -> SourcePlacement {
        self.placement
    }

    /// Rolls the source for one step and returns the target cell if it fires.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<VoxelCoord> {
        if !rng.random_bool(self.probability) {
            return None;
        }
        Some(match self.placement {
            SourcePlacement::Fixed(coord) => coord,
            SourcePlacement::RandomArea {
                min_x,
                max_x,
                min_z,
                max_z,
                y,
            } => VoxelCoord::new(
                rng.random_range(min_x..max_x),
                y,
                rng.random_range(min_z..max_z),
            ),
        })
    }
}
