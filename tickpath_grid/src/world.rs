// Dense voxel grid world provider.
//
// The grid is stored as a flat `Vec<VoxelKind>` indexed by
// `x + z * size_x + y * size_x * size_z` (local coordinates, relative to
// `origin`), giving O(1) reads and writes. Reads outside the grid return
// `None`, which the search treats as unknown; writes outside are no-ops.
//
// `VoxelKind` carries the solidity rule: Air, Water and Lava can be moved
// through, everything else is solid. The kind's discriminant doubles as the
// opaque `Material` the core compares, so material-based filters such as
// `AvoidMaterialsFilter` work against `VoxelKind::material()`.
//
// A `VoxelGrid` answers for whatever environment the probed position names.
// Hosts with several environments keep one grid per environment and route
// probes themselves.
//
// See also: `chunk.rs` for the chunked, cache-backed alternative,
// `tickpath_core::provider` for the capability implemented here.

use serde::{Deserialize, Serialize};
use tickpath_core::{BlockPos, CellInfo, Material, Position, WorldProvider};

/// Contents of one voxel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum VoxelKind {
    #[default]
    Air = 0,
    Stone = 1,
    Dirt = 2,
    Grass = 3,
    Wood = 4,
    Leaves = 5,
    Water = 6,
    Lava = 7,
}

impl VoxelKind {
    pub const ALL: [VoxelKind; 8] = [
        VoxelKind::Air,
        VoxelKind::Stone,
        VoxelKind::Dirt,
        VoxelKind::Grass,
        VoxelKind::Wood,
        VoxelKind::Leaves,
        VoxelKind::Water,
        VoxelKind::Lava,
    ];

    pub fn is_traversable(self) -> bool {
        matches!(self, VoxelKind::Air | VoxelKind::Water | VoxelKind::Lava)
    }

    pub fn is_solid(self) -> bool {
        !self.is_traversable()
    }

    pub fn material(self) -> Material {
        Material(self as u16)
    }

    /// Inverse of `material()`. `None` for materials no kind maps to.
    pub fn from_material(material: Material) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.material() == material)
    }

    pub fn cell(self) -> CellInfo {
        CellInfo::new(self.is_traversable(), self.material())
    }
}

/// Dense 3D voxel grid anchored at `origin`.
#[derive(Clone, Debug)]
pub struct VoxelGrid {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z.
    voxels: Vec<VoxelKind>,
    origin: BlockPos,
    size_x: u32,
    size_y: u32,
    size_z: u32,
}

impl VoxelGrid {
    /// A grid of `size_x * size_y * size_z` Air voxels whose lowest corner is
    /// `origin`.
    pub fn new(origin: BlockPos, size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            voxels: vec![VoxelKind::Air; total],
            origin,
            size_x,
            size_y,
            size_z,
        }
    }

    pub fn origin(&self) -> BlockPos {
        self.origin
    }

    pub fn size(&self) -> (u32, u32, u32) {
        (self.size_x, self.size_y, self.size_z)
    }

    pub fn in_bounds(&self, block: BlockPos) -> bool {
        self.index(block).is_some()
    }

    fn index(&self, block: BlockPos) -> Option<usize> {
        let x = u32::try_from(i64::from(block.x) - i64::from(self.origin.x)).ok()?;
        let y = u32::try_from(i64::from(block.y) - i64::from(self.origin.y)).ok()?;
        let z = u32::try_from(i64::from(block.z) - i64::from(self.origin.z)).ok()?;
        if x >= self.size_x || y >= self.size_y || z >= self.size_z {
            return None;
        }
        let (sx, sz) = (self.size_x as usize, self.size_z as usize);
        Some(x as usize + z as usize * sx + y as usize * sx * sz)
    }

    /// Read a voxel. `None` outside the grid.
    pub fn get(&self, block: BlockPos) -> Option<VoxelKind> {
        self.index(block).map(|i| self.voxels[i])
    }

    /// Write a voxel. No-op outside the grid.
    pub fn set(&mut self, block: BlockPos, kind: VoxelKind) {
        if let Some(i) = self.index(block) {
            self.voxels[i] = kind;
        }
    }

    /// Fill the inclusive box spanned by two corners, in any order. Cells
    /// outside the grid are skipped.
    pub fn fill_box(&mut self, a: BlockPos, b: BlockPos, kind: VoxelKind) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self.set(BlockPos::new(x, y, z), kind);
                }
            }
        }
    }

    /// Number of voxels of the given kind.
    pub fn count(&self, kind: VoxelKind) -> usize {
        self.voxels.iter().filter(|&&v| v == kind).count()
    }
}

impl WorldProvider for VoxelGrid {
    fn probe(&self, position: &Position) -> Option<CellInfo> {
        self.get(position.block()).map(VoxelKind::cell)
    }
}
