//! The six axis-aligned directions a liquid cell face can point.

use glam::Vec3;
use rill_voxel::VoxelCoord;

/// One of the six cardinal directions a cell face can point.
///
/// The `repr(u8)` discriminant doubles as the bit index inside
/// [`super::VisibleFaces`] and the slot in [`super::MeshableVoxel::neighbors`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FaceDirection {
    /// +X direction.
    PosX = 0,
    /// −X direction.
    NegX = 1,
    /// +Y direction (top).
    PosY = 2,
    /// −Y direction (bottom).
    NegY = 3,
    /// +Z direction.
    PosZ = 4,
    /// −Z direction.
    NegZ = 5,
}

impl FaceDirection {
    /// All six directions in discriminant order.
    pub const ALL: [FaceDirection; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// The order faces are written for each cell: top, the four sides, bottom.
    pub const EMISSION_ORDER: [FaceDirection; 6] = [
        Self::PosY,
        Self::NegX,
        Self::PosX,
        Self::PosZ,
        Self::NegZ,
        Self::NegY,
    ];

    /// The four horizontal directions, in emission order.
    pub const SIDES: [FaceDirection; 4] = [Self::NegX, Self::PosX, Self::PosZ, Self::NegZ];

    /// Unit outward normal.
    pub fn normal(self) -> Vec3 {
        match self {
            Self::PosX => Vec3::X,
            Self::NegX => Vec3::NEG_X,
            Self::PosY => Vec3::Y,
            Self::NegY => Vec3::NEG_Y,
            Self::PosZ => Vec3::Z,
            Self::NegZ => Vec3::NEG_Z,
        }
    }

    /// The neighboring cell in this direction.
    pub fn offset(self, coord: VoxelCoord) -> VoxelCoord {
        match self {
            Self::PosX => coord.offset(1, 0, 0),
            Self::NegX => coord.offset(-1, 0, 0),
            Self::PosY => coord.offset(0, 1, 0),
            Self::NegY => coord.offset(0, -1, 0),
            Self::PosZ => coord.offset(0, 0, 1),
            Self::NegZ => coord.offset(0, 0, -1),
        }
    }

    /// Direction index (0–5).
    pub fn index(self) -> usize {
        self as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_normal_agree() {
        let origin = VoxelCoord::new(0, 0, 0);
        for dir in FaceDirection::ALL {
            let n = dir.offset(origin);
            let normal = dir.normal();
            assert_eq!(Vec3::new(n.x as f32, n.y as f32, n.z as f32), normal);
        }
    }

    #[test]
    fn test_emission_order_covers_every_direction_once() {
        let mut seen = [false; 6];
        for dir in FaceDirection::EMISSION_ORDER {
            assert!(!seen[dir.index()]);
            seen[dir.index()] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(FaceDirection::EMISSION_ORDER[0], FaceDirection::PosY);
        assert_eq!(FaceDirection::EMISSION_ORDER[5], FaceDirection::NegY);
    }

    #[test]
    fn test_sides_are_horizontal_and_in_emission_order() {
        assert_eq!(FaceDirection::SIDES, FaceDirection::EMISSION_ORDER[1..5]);
        assert!(FaceDirection::SIDES.iter().all(|d| d.normal().y == 0.0));
    }
}
