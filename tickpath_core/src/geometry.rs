// Spatial value types shared by the whole search stack.
//
// - `Environment`: the world a position lives in (opaque id, name, vertical
//   bounds). Equality and hashing use the name only: two environments with
//   the same name are the same environment, whatever their id says.
// - `Position`: an environment plus three `f64` coordinates. Immutable; every
//   transform returns a new value. Equality and hashing include the
//   environment.
// - `BlockPos`: the floored integer cell of a position. Used as the cheap
//   identity for visited sets and region bookkeeping.
// - `Vector`: a free 3D vector with the usual arithmetic, used for offsets and
//   straightness heuristics.
//
// See also: `node.rs` for the cost model built on these distances,
// `offset.rs` for the fixed neighbor vectors, `path.rs` for interpolation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::{Add, Mul, Neg, Sub};
use std::sync::Arc;

const SQRT_2: f64 = std::f64::consts::SQRT_2;
const SQRT_3: f64 = 1.732_050_807_568_877_2;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Opaque identifier of an environment, assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvironmentId(pub u64);

/// The world a search runs in. Cells must lie strictly between
/// `min_height` and `max_height` to be searchable.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    pub min_height: i32,
    pub max_height: i32,
}

impl Environment {
    pub fn new(id: EnvironmentId, name: impl Into<String>, min_height: i32, max_height: i32) -> Self {
        Self {
            id,
            name: name.into(),
            min_height,
            max_height,
        }
    }

    /// Wrap in an `Arc`, the form `Position` holds.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Whether a cell height lies strictly inside the vertical bounds.
    pub fn contains_height(&self, y: i32) -> bool {
        self.min_height < y && y < self.max_height
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Environment {}

impl Hash for Environment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

// ---------------------------------------------------------------------------
// BlockPos
// ---------------------------------------------------------------------------

/// An integer grid cell. Coordinates are in cell units.
///
/// - X: east (positive) / west (negative)
/// - Y: up (positive) / down (negative)
/// - Z: south (positive) / north (negative)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        (self.x - other.x).unsigned_abs()
            + (self.y - other.y).unsigned_abs()
            + (self.z - other.z).unsigned_abs()
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in an environment.
#[derive(Clone, Debug)]
pub struct Position {
    environment: Arc<Environment>,
    x: f64,
    y: f64,
    z: f64,
}

impl Position {
    pub fn new(environment: &Arc<Environment>, x: f64, y: f64, z: f64) -> Self {
        Self {
            environment: Arc::clone(environment),
            x,
            y,
            z,
        }
    }

    /// The position at the minimum corner of `block`.
    pub fn from_block(environment: &Arc<Environment>, block: BlockPos) -> Self {
        Self::new(environment, block.x as f64, block.y as f64, block.z as f64)
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn block_x(&self) -> i32 {
        self.x.floor() as i32
    }

    pub fn block_y(&self) -> i32 {
        self.y.floor() as i32
    }

    pub fn block_z(&self) -> i32 {
        self.z.floor() as i32
    }

    /// The cell this position falls in.
    pub fn block(&self) -> BlockPos {
        BlockPos::new(self.block_x(), self.block_y(), self.block_z())
    }

    pub fn same_environment(&self, other: &Self) -> bool {
        self.environment == other.environment
    }

    /// Whether both positions share the same floored cell. The environment is
    /// not compared.
    pub fn is_in_same_block(&self, other: &Self) -> bool {
        self.block() == other.block()
    }

    /// Manhattan distance between the floored cells.
    pub fn manhattan_distance(&self, other: &Self) -> u32 {
        self.block().manhattan_distance(other.block())
    }

    /// 3D octile distance: unit cost along an axis, `sqrt(2)` across a face
    /// diagonal and `sqrt(3)` across a cube diagonal.
    pub fn octile_distance(&self, other: &Self) -> f64 {
        let dx = (self.x - other.x).abs();
        let dy = (self.y - other.y).abs();
        let dz = (self.z - other.z).abs();

        let smallest = dx.min(dz).min(dy);
        let highest = dx.max(dz).max(dy);
        let mid = dx + dy + dz - smallest - highest;

        (SQRT_3 - SQRT_2) * smallest + (SQRT_2 - 1.0) * mid + highest
    }

    pub fn distance_squared(&self, other: &Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Linear interpolation towards `other`; `progress` 0.0 is `self`, 1.0 is
    /// `other`. The result stays in this position's environment.
    pub fn interpolate(&self, other: &Self, progress: f64) -> Self {
        self.with_coords(
            self.x + (other.x - self.x) * progress,
            self.y + (other.y - self.y) * progress,
            self.z + (other.z - self.z) * progress,
        )
    }

    pub fn mid_point(&self, other: &Self) -> Self {
        self.interpolate(other, 0.5)
    }

    /// Snap to the minimum corner of the containing cell.
    pub fn floor(&self) -> Self {
        self.with_coords(
            self.block_x() as f64,
            self.block_y() as f64,
            self.block_z() as f64,
        )
    }

    /// The center of the containing cell.
    pub fn mid(&self) -> Self {
        self.with_coords(
            self.block_x() as f64 + 0.5,
            self.block_y() as f64 + 0.5,
            self.block_z() as f64 + 0.5,
        )
    }

    pub fn add(&self, vector: Vector) -> Self {
        self.with_coords(self.x + vector.x, self.y + vector.y, self.z + vector.z)
    }

    pub fn add_xyz(&self, dx: f64, dy: f64, dz: f64) -> Self {
        self.with_coords(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn subtract(&self, vector: Vector) -> Self {
        self.add(-vector)
    }

    pub fn with_x(&self, x: f64) -> Self {
        self.with_coords(x, self.y, self.z)
    }

    pub fn with_y(&self, y: f64) -> Self {
        self.with_coords(self.x, y, self.z)
    }

    pub fn with_z(&self, z: f64) -> Self {
        self.with_coords(self.x, self.y, z)
    }

    pub fn to_vector(&self) -> Vector {
        Vector::new(self.x, self.y, self.z)
    }

    fn with_coords(&self, x: f64, y: f64, z: f64) -> Self {
        Self::new(&self.environment, x, y, z)
    }
}

// `-0.0 + 0.0 == +0.0`, so the bit patterns agree for both zeros and the
// Hash/Eq pair stays consistent.
fn canonical_bits(v: f64) -> u64 {
    (v + 0.0).to_bits()
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        canonical_bits(self.x) == canonical_bits(other.x)
            && canonical_bits(self.y) == canonical_bits(other.y)
            && canonical_bits(self.z) == canonical_bits(other.z)
            && self.environment == other.environment
    }
}

impl Eq for Position {}

impl Hash for Position {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.environment.hash(state);
        canonical_bits(self.x).hash(state);
        canonical_bits(self.y).hash(state);
        canonical_bits(self.z).hash(state);
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@({:.2}, {:.2}, {:.2})",
            self.environment.name, self.x, self.y, self.z
        )
    }
}

// ---------------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------------

/// A free vector in 3D space.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - other.y * self.z,
            self.z * other.x - other.z * self.x,
            self.x * other.y - other.x * self.y,
        )
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Unit vector in the same direction. The zero vector normalizes to
    /// itself.
    pub fn normalize(self) -> Self {
        let length = self.length();
        if length == 0.0 { self } else { self * (1.0 / length) }
    }

    pub fn divide(self, value: f64) -> Self {
        Self::new(self.x / value, self.y / value, self.z / value)
    }

    /// Distance from `point` to the segment from `a` to `b`. A degenerate segment
    /// measures the distance to `a`.
    pub fn distance_to_segment(point: Self, a: Self, b: Self) -> f64 {
        let ab = b - a;
        let len_sq = ab.dot(ab);
        if len_sq == 0.0 {
            return point.distance(a);
        }
        let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
        point.distance(a + ab * t)
    }

    /// Distance from `point` to the infinite line through `a` and `b`, via the
    /// cross product. A degenerate line measures the distance to `a`.
    pub fn distance_to_line(point: Self, a: Self, b: Self) -> f64 {
        let ab = b - a;
        let length = ab.length();
        if length == 0.0 {
            return point.distance(a);
        }
        (point - a).cross(ab).length() / length
    }
}

impl Add for Vector {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Vector {
    type Output = Self;

    fn mul(self, value: f64) -> Self {
        Self::new(self.x * value, self.y * value, self.z * value)
    }
}

impl Neg for Vector {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}
