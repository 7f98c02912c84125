//! Integer cell coordinates used as grid keys.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a single cell of the voxel grid.
///
/// Ordering is lexicographic over `(x, y, z)`, which is the iteration order
/// used by a propagation step.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VoxelCoord {
    /// Cell X coordinate.
    pub x: i32,
    /// Cell Y coordinate (up).
    pub y: i32,
    /// Cell Z coordinate.
    pub z: i32,
}

impl VoxelCoord {
    /// Creates a new coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns the coordinate offset by `(dx, dy, dz)`.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// The cell directly above.
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// The cell directly below.
    pub const fn below(self) -> Self {
        self.offset(0, -1, 0)
    }

    /// The four horizontal neighbors in spreading slot order: −X, +X, +Z, −Z.
    pub const fn lateral_neighbors(self) -> [Self; 4] {
        [
            self.offset(-1, 0, 0),
            self.offset(1, 0, 0),
            self.offset(0, 0, 1),
            self.offset(0, 0, -1),
        ]
    }
}

impl From<(i32, i32, i32)> for VoxelCoord {
    fn from((x, y, z): (i32, i32, i32)) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}
