// Finished paths and the transforms hosts apply to them.
//
// A `Path` is an ordered list of positions plus a designated start and end.
// The designated endpoints are fixed by whoever builds the path and need not
// be the literal first/last element (an empty path still has both). Every
// transform returns a new `Path`; none mutate in place.
//
// - `interpolate(r)`: insert evenly spaced points so no two neighbors are
//   more than `r` apart. Input positions are kept, none are duplicated.
// - `simplify(eps)`: keep every `round(1 / eps)`-th position plus the first
//   and last, in order.
// - `trim(n)`: the first `n` positions.
// - `join(other)`: this path followed by `other`.
// - `mutate_positions(f)`: map every position.

use crate::error::{PathfindingError, Result};
use crate::geometry::Position;

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    start: Position,
    end: Position,
    positions: Vec<Position>,
}

impl Path {
    pub fn new(start: Position, end: Position, positions: Vec<Position>) -> Self {
        Self {
            start,
            end,
            positions,
        }
    }

    /// A path whose endpoints are its first and last positions. `None` if
    /// `positions` is empty.
    pub fn from_positions(positions: Vec<Position>) -> Option<Self> {
        let start = positions.first()?.clone();
        let end = positions.last()?.clone();
        Some(Self::new(start, end, positions))
    }

    /// No positions, only designated endpoints.
    pub fn empty(start: Position, end: Position) -> Self {
        Self::new(start, end, Vec::new())
    }

    pub fn start(&self) -> &Position {
        &self.start
    }

    pub fn end(&self) -> &Position {
        &self.end
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Position> {
        self.positions.iter()
    }

    pub fn interpolate(&self, resolution: f64) -> Result<Self> {
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(PathfindingError::InvalidResolution { resolution });
        }

        let mut out = Vec::with_capacity(self.positions.len());
        let mut previous: Option<&Position> = None;
        for position in &self.positions {
            if let Some(from) = previous {
                let steps = (from.distance(position) / resolution).ceil() as usize;
                // The final step lands on `position`, pushed below.
                for i in 1..steps {
                    out.push(from.interpolate(position, i as f64 / steps as f64));
                }
            }
            out.push(position.clone());
            previous = Some(position);
        }
        Ok(Self::new(self.start.clone(), self.end.clone(), out))
    }

    pub fn simplify(&self, epsilon: f64) -> Result<Self> {
        if !epsilon.is_finite() || epsilon <= 0.0 || epsilon > 1.0 {
            return Err(PathfindingError::InvalidEpsilon { epsilon });
        }

        let stride = ((1.0 / epsilon).round() as usize).max(1);
        let last = self.positions.len().saturating_sub(1);
        let kept = self
            .positions
            .iter()
            .enumerate()
            .filter(|&(i, _)| i % stride == 0 || i == last)
            .map(|(_, position)| position.clone())
            .collect();
        Ok(Self::new(self.start.clone(), self.end.clone(), kept))
    }

    /// The first `length` positions. The end becomes the last kept position,
    /// or the start when nothing is kept.
    pub fn trim(&self, length: usize) -> Self {
        let kept: Vec<Position> = self.positions.iter().take(length).cloned().collect();
        let end = kept.last().unwrap_or(&self.start).clone();
        Self::new(self.start.clone(), end, kept)
    }

    pub fn join(&self, other: &Self) -> Self {
        let mut positions = Vec::with_capacity(self.len() + other.len());
        positions.extend_from_slice(&self.positions);
        positions.extend_from_slice(&other.positions);
        Self::new(self.start.clone(), other.end.clone(), positions)
    }

    /// Map every position. The endpoints become the first and last mapped
    /// positions; an empty path maps its endpoints directly.
    pub fn mutate_positions(&self, mut f: impl FnMut(&Position) -> Position) -> Self {
        let positions: Vec<Position> = self.positions.iter().map(&mut f).collect();
        match (positions.first(), positions.last()) {
            (Some(first), Some(last)) => Self::new(first.clone(), last.clone(), positions),
            _ => Self::empty(f(&self.start), f(&self.end)),
        }
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a Position;
    type IntoIter = std::slice::Iter<'a, Position>;

    fn into_iter(self) -> Self::IntoIter {
        self.positions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Environment, EnvironmentId};
    use std::sync::Arc;

    fn env() -> Arc<Environment> {
        Environment::new(EnvironmentId(0), "test", -64, 320).shared()
    }

    fn line(env: &Arc<Environment>, xs: impl IntoIterator<Item = i32>) -> Path {
        let positions = xs
            .into_iter()
            .map(|x| Position::new(env, x as f64, 0.0, 0.0))
            .collect();
        Path::from_positions(positions).unwrap()
    }

    #[test]
    fn interpolate_bounds_step_length() {
        let env = env();
        let path = Path::from_positions(vec![
            Position::new(&env, 0.0, 0.0, 0.0),
            Position::new(&env, 3.0, 0.0, 4.0),
            Position::new(&env, 3.0, 2.0, 4.0),
            Position::new(&env, 3.0, 2.0, 4.0),
        ])
        .unwrap();
        for resolution in [0.3, 0.5, 1.0, 2.5, 10.0] {
            let dense = path.interpolate(resolution).unwrap();
            for pair in dense.positions().windows(2) {
                assert!(pair[0].distance(&pair[1]) <= resolution + 1e-9);
            }
            assert_eq!(dense.start(), path.start());
            assert_eq!(dense.end(), path.end());
            assert_eq!(dense.positions().first(), path.positions().first());
            assert_eq!(dense.positions().last(), path.positions().last());
        }
    }

    #[test]
    fn interpolate_keeps_inputs_without_duplicates() {
        let env = env();
        let path = line(&env, [0, 2]);
        let dense = path.interpolate(0.5).unwrap();
        let xs: Vec<f64> = dense.iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn interpolate_rejects_bad_resolution() {
        let path = line(&env(), [0, 1]);
        assert!(matches!(
            path.interpolate(0.0),
            Err(PathfindingError::InvalidResolution { .. })
        ));
        assert!(path.interpolate(f64::INFINITY).is_err());
    }

    #[test]
    fn simplify_keeps_endpoints() {
        let env = env();
        let path = line(&env, 0..10);
        let simple = path.simplify(0.25).unwrap();
        let xs: Vec<f64> = simple.iter().map(|p| p.x()).collect();
        assert_eq!(xs, vec![0.0, 4.0, 8.0, 9.0]);
        assert_eq!(simple.start(), path.start());
        assert_eq!(simple.end(), path.end());

        assert_eq!(path.simplify(1.0).unwrap().len(), 10);
        assert_eq!(path.simplify(0.01).unwrap().len(), 2);
    }

    #[test]
    fn simplify_rejects_out_of_range_epsilon() {
        let path = line(&env(), 0..3);
        for epsilon in [0.0, -0.5, 1.5, f64::NAN] {
            assert!(matches!(
                path.simplify(epsilon),
                Err(PathfindingError::InvalidEpsilon { .. })
            ));
        }
    }

    #[test]
    fn trim_lengths() {
        let env = env();
        let path = line(&env, 0..5);
        for n in 0..8 {
            let trimmed = path.trim(n);
            assert_eq!(trimmed.len(), n.min(path.len()));
            assert_eq!(trimmed.start(), path.start());
            if n > 0 {
                assert_eq!(trimmed.positions()[0], *path.start());
            }
        }
        assert_eq!(path.trim(2).end().x(), 1.0);
        assert_eq!(path.trim(0).end(), path.start());
    }

    #[test]
    fn join_concatenates() {
        let env = env();
        let a = line(&env, 0..3);
        let b = line(&env, 10..14);
        let joined = a.join(&b);
        assert_eq!(joined.len(), a.len() + b.len());
        assert_eq!(joined.end(), b.end());
        assert_eq!(joined.start(), a.start());
    }

    #[test]
    fn mutate_positions_rebases_endpoints() {
        let env = env();
        let path = line(&env, 0..3);
        let lifted = path.mutate_positions(|p| p.with_y(5.0));
        assert!(lifted.iter().all(|p| p.y() == 5.0));
        assert_eq!(lifted.start().y(), 5.0);
        assert_eq!(lifted.end().x(), 2.0);

        let empty = Path::empty(path.start().clone(), path.end().clone());
        let moved = empty.mutate_positions(|p| p.with_z(1.0));
        assert!(moved.is_empty());
        assert_eq!(moved.end().z(), 1.0);
    }

    #[test]
    fn iteration_is_restartable() {
        let path = line(&env(), 0..4);
        let first: Vec<_> = (&path).into_iter().collect();
        let second: Vec<_> = path.iter().collect();
        assert_eq!(first, second);
        let mut count = 0;
        for _ in &path {
            count += 1;
        }
        assert_eq!(count, 4);
    }
}
