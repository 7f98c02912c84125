//! The liquid voxel value type.
//!
//! A voxel pairs a material id with a discrete fill volume. The sign of the id
//! classifies the cell: zero is air, negative ids are solid terrain, positive
//! ids are liquids.

use serde::{Deserialize, Serialize};

/// Largest volume a single cell can hold.
pub const MAX_VOLUME: u8 = 7;

/// Material id of air.
pub const AIR_ID: i32 = 0;

/// Material id the default world uses for terrain.
pub const STONE_ID: i32 = -1;

/// A cell's material and fill level.
///
/// Volume is clamped to `[0, MAX_VOLUME]` by every constructor and mutation
/// helper, and is always 0 for air.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LiquidVoxel {
    id: i32,
    volume: u8,
}

impl LiquidVoxel {
    /// Empty space.
    pub const AIR: Self = Self {
        id: AIR_ID,
        volume: 0,
    };

    /// Creates a voxel, clamping `volume` into `[0, MAX_VOLUME]`.
    pub fn new(id: i32, volume: i32) -> Self {
        let volume = if id == AIR_ID {
            0
        } else {
            volume.clamp(0, MAX_VOLUME as i32) as u8
        };
        Self { id, volume }
    }

    /// A completely filled liquid cell.
    pub fn full(id: i32) -> Self {
        Self::new(id, MAX_VOLUME as i32)
    }

    /// A solid cell. Solids report a full volume, which the flow rules never read.
    pub fn solid(id: i32) -> Self {
        assert!(id < 0, "solid ids are negative, got {id}");
        Self::full(id)
    }

    /// Material id.
    pub fn id(self) -> i32 {
        self.id
    }

    /// Fill level in `[0, MAX_VOLUME]`.
    pub fn volume(self) -> u8 {
        self.volume
    }

    pub fn is_air(self) -> bool {
        self.id == AIR_ID
    }

    pub fn is_solid(self) -> bool {
        self.id < 0
    }

    pub fn is_liquid(self) -> bool {
        self.id > 0
    }

    /// Room left before the cell is full.
    pub fn capacity(self) -> u8 {
        MAX_VOLUME - self.volume
    }

    /// Same material with a new (clamped) volume.
    pub fn with_volume(self, volume: i32) -> Self {
        Self::new(self.id, volume)
    }

    /// Same material with `extra` units added (clamped).
    pub fn add_volume(self, extra: i32) -> Self {
        self.with_volume(self.volume as i32 + extra)
    }

    /// Same material with `amount` units removed (clamped at 0).
    pub fn less_volume(self, amount: i32) -> Self {
        self.with_volume(self.volume as i32 - amount)
    }
}

impl Default for LiquidVoxel {
    fn default() -> Self {
        Self::AIR
    }
}
