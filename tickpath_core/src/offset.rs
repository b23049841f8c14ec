// Neighbor offset sets used by the expansion step.
//
// `Straight` is the six axis-aligned unit moves. `Diagonal` is the full
// 3x3x3 neighborhood minus the center (26 moves). `Merged` is the union of
// both, deduplicated; since every straight move is also in the diagonal
// cube, it contains the same 26 vectors with the straight moves first so
// cheap axis moves are tried before diagonals.

use crate::geometry::Vector;
use once_cell::sync::Lazy;

/// A move from one cell to a neighbor, in cell units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
    pub dz: i32,
}

impl Offset {
    pub const fn new(dx: i32, dy: i32, dz: i32) -> Self {
        Self { dx, dy, dz }
    }

    /// Differs in both horizontal axes.
    pub fn is_horizontal_diagonal(self) -> bool {
        self.dx != 0 && self.dz != 0
    }

    pub fn vector(self) -> Vector {
        Vector::new(self.dx as f64, self.dy as f64, self.dz as f64)
    }
}

static STRAIGHT: [Offset; 6] = [
    Offset::new(1, 0, 0),
    Offset::new(-1, 0, 0),
    Offset::new(0, 0, 1),
    Offset::new(0, 0, -1),
    Offset::new(0, 1, 0),
    Offset::new(0, -1, 0),
];

static DIAGONAL: Lazy<Vec<Offset>> = Lazy::new(|| {
    let mut offsets = Vec::with_capacity(26);
    for dy in -1..=1 {
        for dx in -1..=1 {
            for dz in -1..=1 {
                if (dx, dy, dz) != (0, 0, 0) {
                    offsets.push(Offset::new(dx, dy, dz));
                }
            }
        }
    }
    offsets
});

static MERGED: Lazy<Vec<Offset>> = Lazy::new(|| {
    let mut offsets: Vec<Offset> = STRAIGHT.to_vec();
    for &offset in DIAGONAL.iter() {
        if !offsets.contains(&offset) {
            offsets.push(offset);
        }
    }
    offsets
});

/// Which neighbor set an expansion uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OffsetSet {
    Straight,
    Diagonal,
    Merged,
}

impl OffsetSet {
    /// The set selected by the diagonal-movement flag.
    pub fn for_diagonal(allowing_diagonal: bool) -> Self {
        if allowing_diagonal {
            Self::Merged
        } else {
            Self::Straight
        }
    }

    pub fn offsets(self) -> &'static [Offset] {
        match self {
            Self::Straight => &STRAIGHT[..],
            Self::Diagonal => DIAGONAL.as_slice(),
            Self::Merged => MERGED.as_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustc_hash::FxHashSet;

    #[test]
    fn set_sizes() {
        assert_eq!(OffsetSet::Straight.offsets().len(), 6);
        assert_eq!(OffsetSet::Diagonal.offsets().len(), 26);
        assert_eq!(OffsetSet::Merged.offsets().len(), 26);
    }

    #[test]
    fn merged_is_deduplicated_union() {
        let merged: FxHashSet<Offset> = OffsetSet::Merged.offsets().iter().copied().collect();
        assert_eq!(merged.len(), OffsetSet::Merged.offsets().len());
        for offset in OffsetSet::Straight.offsets() {
            assert!(merged.contains(offset));
        }
        for offset in OffsetSet::Diagonal.offsets() {
            assert!(merged.contains(offset));
        }
        assert_eq!(&OffsetSet::Merged.offsets()[..6], OffsetSet::Straight.offsets());
    }

    #[test]
    fn no_zero_offset() {
        for set in [OffsetSet::Straight, OffsetSet::Diagonal, OffsetSet::Merged] {
            assert!(!set.offsets().contains(&Offset::new(0, 0, 0)));
        }
    }

    #[test]
    fn flag_selects_set() {
        assert_eq!(OffsetSet::for_diagonal(false), OffsetSet::Straight);
        assert_eq!(OffsetSet::for_diagonal(true), OffsetSet::Merged);
    }
}
