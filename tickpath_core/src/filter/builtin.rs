// Built-in filters.
//
// - `PassableFilter`: the candidate cell is known and traversable.
// - `SolidGroundFilter`: the cell below the candidate is known and solid, so
//   a walker can stand on it. Depends on `PassableFilter`.
// - `AvoidMaterialsFilter`: no cell within a cube of `radius` around the
//   candidate has one of the listed materials. Unknown cells are ignored.

use super::{FilterKey, PathFilter, PathValidationContext};
use crate::provider::Material;
use rustc_hash::FxHashSet;

#[derive(Clone, Copy, Debug, Default)]
pub struct PassableFilter;

impl PassableFilter {
    pub const KEY: FilterKey = FilterKey("passable");
}

impl PathFilter for PassableFilter {
    fn filter(&self, ctx: &PathValidationContext<'_>) -> bool {
        ctx.probe_here().is_some_and(|cell| cell.traversable)
    }

    fn key(&self) -> FilterKey {
        Self::KEY
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SolidGroundFilter;

impl SolidGroundFilter {
    pub const KEY: FilterKey = FilterKey("solid_ground");
}

impl PathFilter for SolidGroundFilter {
    fn filter(&self, ctx: &PathValidationContext<'_>) -> bool {
        let below = ctx.position.add_xyz(0.0, -1.0, 0.0);
        ctx.probe(&below).is_some_and(|cell| !cell.traversable)
    }

    fn key(&self) -> FilterKey {
        Self::KEY
    }

    fn dependencies(&self) -> &'static [FilterKey] {
        &[PassableFilter::KEY]
    }
}

#[derive(Clone, Debug)]
pub struct AvoidMaterialsFilter {
    materials: FxHashSet<Material>,
    radius: i32,
}

impl AvoidMaterialsFilter {
    pub const KEY: FilterKey = FilterKey("avoid_materials");

    pub fn new(materials: impl IntoIterator<Item = Material>, radius: u16) -> Self {
        Self {
            materials: materials.into_iter().collect(),
            radius: i32::from(radius),
        }
    }
}

impl PathFilter for AvoidMaterialsFilter {
    fn filter(&self, ctx: &PathValidationContext<'_>) -> bool {
        let r = self.radius;
        for dx in -r..=r {
            for dy in -r..=r {
                for dz in -r..=r {
                    let probe = ctx.position.add_xyz(dx as f64, dy as f64, dz as f64);
                    let dangerous = ctx
                        .probe(&probe)
                        .is_some_and(|cell| self.materials.contains(&cell.material));
                    if dangerous {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn key(&self) -> FilterKey {
        Self::KEY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId, Position};
    use crate::provider::CellInfo;

    const LAVA: Material = Material(7);
    const STONE: Material = Material(1);
    const AIR: Material = Material(0);

    // Stone floor at y < 0, air above, a lava cell at (3, 0, 0).
    fn world(position: &Position) -> Option<CellInfo> {
        let block = position.block();
        if block.x.abs() > 10 || block.z.abs() > 10 {
            return None;
        }
        if block.y < 0 {
            Some(CellInfo::solid(STONE))
        } else if (block.x, block.y, block.z) == (3, 0, 0) {
            Some(CellInfo::open(LAVA))
        } else {
            Some(CellInfo::open(AIR))
        }
    }

    fn check(filter: &dyn PathFilter, x: f64, y: f64, z: f64) -> bool {
        let env = Environment::new(EnvironmentId(0), "test", -64, 320).shared();
        let here = Position::new(&env, x, y, z);
        let origin = Position::new(&env, 0.0, 0.0, 0.0);
        let provider = world;
        filter.filter(&PathValidationContext {
            position: &here,
            parent: None,
            start: &origin,
            target: &origin,
            provider: &provider,
        })
    }

    #[test]
    fn passable_needs_known_open_cell() {
        assert!(check(&PassableFilter, 0.0, 0.0, 0.0));
        assert!(!check(&PassableFilter, 0.0, -1.0, 0.0));
        assert!(!check(&PassableFilter, 50.0, 0.0, 0.0));
    }

    #[test]
    fn solid_ground_needs_solid_below() {
        assert!(check(&SolidGroundFilter, 0.0, 0.0, 0.0));
        assert!(!check(&SolidGroundFilter, 0.0, 1.0, 0.0));
        assert_eq!(SolidGroundFilter.dependencies(), &[PassableFilter::KEY]);
    }

    #[test]
    fn avoid_materials_checks_radius() {
        let filter = AvoidMaterialsFilter::new([LAVA], 1);
        assert!(check(&filter, 0.0, 0.0, 0.0));
        assert!(!check(&filter, 2.0, 0.0, 0.0));
        assert!(!check(&filter, 4.0, 1.0, -1.0));
        assert!(check(&filter, 5.0, 0.0, 0.0));

        let strict = AvoidMaterialsFilter::new([LAVA], 0);
        assert!(!check(&strict, 3.0, 0.0, 0.0));
        assert!(check(&strict, 2.0, 0.0, 0.0));
    }
}
