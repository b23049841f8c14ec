// Filters that understand `VoxelKind`.
//
// The core's built-ins only look at traversability and opaque materials.
// Filters here know which material a voxel kind maps to.
//
// - `WaterFilter`: the candidate cell is Water. Unknown cells fail.

use crate::world::VoxelKind;
use tickpath_core::filter::FilterKey;
use tickpath_core::{PathFilter, PathValidationContext};

/// Keeps a search inside water, for swimmers.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaterFilter;

impl WaterFilter {
    pub const KEY: FilterKey = FilterKey("water");
}

impl PathFilter for WaterFilter {
    fn filter(&self, ctx: &PathValidationContext<'_>) -> bool {
        ctx.probe_here()
            .is_some_and(|cell| cell.material == VoxelKind::Water.material())
    }

    fn key(&self) -> FilterKey {
        Self::KEY
    }
}
