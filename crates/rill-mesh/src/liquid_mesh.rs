//! Preallocated output buffers for liquid meshes.
//!
//! The buffers are sized for a number of cells up front (24 vertices and 36
//! indices per cell, enough for all six faces) and reused across rebuilds.
//! Only the leading `counts()` entries of each buffer are valid after a build.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rill_config::MeshConfig;
use tracing::warn;

/// Vertices a cell can emit: 6 faces × 4 corners.
pub const VERTICES_PER_CELL: usize = 24;
/// Indices a cell can emit: 6 faces × 2 triangles × 3.
pub const INDICES_PER_CELL: usize = 36;

/// Surface height of a cell holding `volume` units, indexed by volume.
pub const FILL_HEIGHTS: [f32; 8] = [
    0.0,
    1.0 / 7.0,
    2.0 / 7.0,
    3.0 / 7.0,
    4.0 / 7.0,
    5.0 / 7.0,
    6.0 / 7.0,
    1.0,
];

/// Height of the liquid surface inside a cell, in cell units.
pub fn fill_height(volume: u8) -> f32 {
    FILL_HEIGHTS[volume.min(7) as usize]
}

/// Interleaved position + normal vertex for single-buffer upload.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LiquidVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

static_assertions::assert_eq_size!(LiquidVertex, [u8; 24]);

/// Number of valid entries in each output buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshCounts {
    pub vertices: usize,
    pub indices: usize,
    pub normals: usize,
}

/// Reusable vertex, normal, and index buffers sized for a cell capacity.
#[derive(Clone, Debug)]
pub struct LiquidMeshBuffers {
    positions: Vec<[f32; 3]>,
    normals: Vec<[f32; 3]>,
    indices: Vec<u32>,
    counts: MeshCounts,
    capacity: usize,
    scaling: f32,
}

impl LiquidMeshBuffers {
    /// Allocates buffers for `capacity` cells that grow by `scaling` when
    /// outgrown.
    ///
    /// # Panics
    ///
    /// Panics if `scaling` is not greater than 1.
    pub fn new(capacity: usize, scaling: f32) -> Self {
        assert!(scaling > 1.0, "capacity scaling must exceed 1.0, got {scaling}");
        Self {
            positions: vec![[0.0; 3]; capacity * VERTICES_PER_CELL],
            normals: vec![[0.0; 3]; capacity * VERTICES_PER_CELL],
            indices: vec![0; capacity * INDICES_PER_CELL],
            counts: MeshCounts::default(),
            capacity,
            scaling,
        }
    }

    pub fn from_config(config: &MeshConfig) -> Self {
        Self::new(config.initial_capacity, config.capacity_scaling)
    }

    /// Number of cells the buffers can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn counts(&self) -> MeshCounts {
        self.counts
    }

    /// Valid vertex positions.
    pub fn vertices(&self) -> &[[f32; 3]] {
        &self.positions[..self.counts.vertices]
    }

    /// Valid per-vertex normals.
    pub fn normals(&self) -> &[[f32; 3]] {
        &self.normals[..self.counts.normals]
    }

    /// Valid triangle indices.
    pub fn indices(&self) -> &[u32] {
        &self.indices[..self.counts.indices]
    }

    /// The valid indices as raw bytes.
    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.indices())
    }

    pub fn quad_count(&self) -> usize {
        self.counts.indices / 6
    }

    pub fn is_empty(&self) -> bool {
        self.counts.indices == 0
    }

    /// Marks every entry invalid without touching the allocation.
    pub fn reset(&mut self) {
        self.counts = MeshCounts::default();
    }

    /// Grows all buffers together when `cells` exceeds the capacity.
    ///
    /// The new capacity is `ceil(cells × scaling)`. Returns `true` if the
    /// buffers were reallocated, which also resets the counts.
    pub fn ensure_capacity(&mut self, cells: usize) -> bool {
        if cells <= self.capacity {
            return false;
        }
        let grown = (cells as f64 * self.scaling as f64).ceil() as usize;
        warn!(
            "Liquid mesh buffers outgrown ({} cells > capacity {}), reallocating for {} cells",
            cells, self.capacity, grown
        );
        self.positions = vec![[0.0; 3]; grown * VERTICES_PER_CELL];
        self.normals = vec![[0.0; 3]; grown * VERTICES_PER_CELL];
        self.indices = vec![0; grown * INDICES_PER_CELL];
        self.capacity = grown;
        self.reset();
        true
    }

    /// Appends one quad: 4 corners sharing `normal`, and the two triangles
    /// `(0, 1, 2)` and `(0, 2, 3)` over them.
    ///
    /// # Panics
    ///
    /// Panics if the buffers are full.
    pub fn push_quad(&mut self, corners: [Vec3; 4], normal: Vec3) {
        let v = self.counts.vertices;
        let i = self.counts.indices;
        assert!(
            v + 4 <= self.positions.len() && i + 6 <= self.indices.len(),
            "liquid mesh buffers full at {} vertices",
            v
        );

        for (k, corner) in corners.iter().enumerate() {
            self.positions[v + k] = corner.to_array();
            self.normals[v + k] = normal.to_array();
        }
        let b = v as u32;
        self.indices[i..i + 6].copy_from_slice(&[b, b + 1, b + 2, b, b + 2, b + 3]);

        self.counts.vertices += 4;
        self.counts.normals += 4;
        self.counts.indices += 6;
    }

    /// Valid vertices as an interleaved position + normal buffer.
    pub fn interleaved(&self) -> Vec<LiquidVertex> {
        self.vertices()
            .iter()
            .zip(self.normals())
            .map(|(&position, &normal)| LiquidVertex { position, normal })
            .collect()
    }
}

impl Default for LiquidMeshBuffers {
    fn default() -> Self {
        Self::from_config(&MeshConfig::default())
    }
}
