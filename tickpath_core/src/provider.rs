// The world-data capability consumed by the search.
//
// The core never reads host world storage directly. Everything it knows about
// a cell comes from `WorldProvider::probe`, which answers "is this cell
// traversable, and what is it made of" or `None` when the provider cannot
// resolve the cell without loading more data. Whether to force a load is the
// provider's policy, not the search's.
//
// Closures `Fn(&Position) -> Option<CellInfo>` are providers too, which keeps
// tests and small hosts free of boilerplate.
//
// See also: `tickpath_grid` for the shipped voxel and chunked providers.

use crate::geometry::Position;
use serde::{Deserialize, Serialize};

/// Opaque material classification. The meaning of each value belongs to the
/// provider; the core only compares them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Material(pub u16);

/// What a provider knows about one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellInfo {
    pub traversable: bool,
    pub material: Material,
}

impl CellInfo {
    pub const fn new(traversable: bool, material: Material) -> Self {
        Self {
            traversable,
            material,
        }
    }

    pub const fn open(material: Material) -> Self {
        Self::new(true, material)
    }

    pub const fn solid(material: Material) -> Self {
        Self::new(false, material)
    }
}

pub trait WorldProvider: Send + Sync {
    /// Describe the cell containing `position`, or `None` if unknown.
    fn probe(&self, position: &Position) -> Option<CellInfo>;
}

impl<F> WorldProvider for F
where
    F: Fn(&Position) -> Option<CellInfo> + Send + Sync,
{
    fn probe(&self, position: &Position) -> Option<CellInfo> {
        self(position)
    }
}
