// Chunked world access through a shared snapshot cache.
//
// Hosts with large or streaming worlds expose them as 16x16 vertical columns
// (`ChunkPos`) through the `ChunkSource` trait. A source reports which chunks
// are resident (cheap to read right now) and can produce an immutable
// `ChunkSnapshot` of a chunk, loading it if needed.
//
// Snapshots taken by a search are kept in a `ChunkCache`: a `DashMap` keyed
// by (environment id, chunk) whose entries are dropped after `ttl` without a
// read. Expired entries go when they are next read, and every
// `PURGE_INTERVAL` inserts sweep the whole map. The cache is internally
// synchronized, so any number of concurrent searches share it. `ChunkCache::global()` is the process-wide instance;
// hosts call `invalidate_chunk` when they change a chunk so later probes
// re-snapshot it.
//
// Two loading policies sit on top:
// - `FailingProvider`: cached snapshot, else a fresh snapshot of a resident
//   chunk, else unknown. Never forces a load.
// - `LoadingProvider`: cached snapshot, else load through the source.
//
// `provider_for` picks between them from `PathfinderConfig::loading_chunks`.
//
// See also: `world.rs` for `VoxelKind` and the dense single-grid provider.

use crate::world::VoxelKind;
use dashmap::{DashMap, DashSet};
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tickpath_core::{BlockPos, CellInfo, Environment, EnvironmentId, PathfinderConfig, Position, WorldProvider};

/// Side length of a chunk column in cells.
pub const CHUNK_SIZE: i32 = 16;
pub const DEFAULT_CHUNK_TTL: Duration = Duration::from_secs(300);
/// Inserts between full sweeps of expired snapshots.
pub const PURGE_INTERVAL: u64 = 1024;

static GLOBAL_CACHE: Lazy<Arc<ChunkCache>> = Lazy::new(|| Arc::new(ChunkCache::default()));

/// Column coordinates of a chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The chunk whose column contains `block`.
    pub fn containing(block: BlockPos) -> Self {
        Self::new(block.x.div_euclid(CHUNK_SIZE), block.z.div_euclid(CHUNK_SIZE))
    }

    /// World coordinates of the chunk's lowest corner at height `y`.
    pub fn min_block(self, y: i32) -> BlockPos {
        BlockPos::new(self.x * CHUNK_SIZE, y, self.z * CHUNK_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Immutable copy of one chunk column from `min_y` (inclusive) up through
/// `height` cells.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChunkSnapshot {
    pos: ChunkPos,
    min_y: i32,
    height: u32,
    /// Flat storage: index = lx + lz * 16 + (y - min_y) * 256.
    voxels: Vec<VoxelKind>,
}

impl ChunkSnapshot {
    /// An all-Air snapshot.
    pub fn new(pos: ChunkPos, min_y: i32, height: u32) -> Self {
        let area = (CHUNK_SIZE * CHUNK_SIZE) as usize;
        Self {
            pos,
            min_y,
            height,
            voxels: vec![VoxelKind::Air; area * height as usize],
        }
    }

    /// Build a snapshot by sampling `sample` at every cell of the column.
    pub fn from_fn(
        pos: ChunkPos,
        min_y: i32,
        height: u32,
        mut sample: impl FnMut(BlockPos) -> VoxelKind,
    ) -> Self {
        let mut snapshot = Self::new(pos, min_y, height);
        let origin = pos.min_block(min_y);
        for ly in 0..height as i32 {
            for lz in 0..CHUNK_SIZE {
                for lx in 0..CHUNK_SIZE {
                    let block = origin.offset(lx, ly, lz);
                    snapshot.set(block, sample(block));
                }
            }
        }
        snapshot
    }

    pub fn pos(&self) -> ChunkPos {
        self.pos
    }

    fn index(&self, block: BlockPos) -> Option<usize> {
        if ChunkPos::containing(block) != self.pos {
            return None;
        }
        let ly = u32::try_from(i64::from(block.y) - i64::from(self.min_y)).ok()?;
        if ly >= self.height {
            return None;
        }
        let lx = block.x.rem_euclid(CHUNK_SIZE) as usize;
        let lz = block.z.rem_euclid(CHUNK_SIZE) as usize;
        let side = CHUNK_SIZE as usize;
        Some(lx + lz * side + ly as usize * side * side)
    }

    /// Voxel at a world cell. `None` outside the column or its height range.
    pub fn get(&self, block: BlockPos) -> Option<VoxelKind> {
        self.index(block).map(|i| self.voxels[i])
    }

    /// Write a voxel at a world cell. No-op outside the column.
    pub fn set(&mut self, block: BlockPos, kind: VoxelKind) {
        if let Some(i) = self.index(block) {
            self.voxels[i] = kind;
        }
    }
}

/// Host-side access to chunk data.
pub trait ChunkSource: Send + Sync {
    /// Whether the chunk can be read without loading it.
    fn is_resident(&self, environment: &Environment, chunk: ChunkPos) -> bool;

    /// Snapshot the chunk, loading it if it is not resident. `None` if the
    /// chunk does not exist.
    fn load(&self, environment: &Environment, chunk: ChunkPos) -> Option<ChunkSnapshot>;
}

// ---------------------------------------------------------------------------
// ChunkedWorld
// ---------------------------------------------------------------------------

type ChunkGenerator = dyn Fn(&Environment, ChunkPos) -> ChunkSnapshot + Send + Sync;

/// A `ChunkSource` that generates chunks on demand and tracks which ones are
/// resident. Loading a chunk makes it resident.
pub struct ChunkedWorld {
    generator: Box<ChunkGenerator>,
    resident: DashSet<(EnvironmentId, ChunkPos), FxBuildHasher>,
    loads: AtomicU64,
}

impl ChunkedWorld {
    pub fn new<G>(generator: G) -> Self
    where
        G: Fn(&Environment, ChunkPos) -> ChunkSnapshot + Send + Sync + 'static,
    {
        Self {
            generator: Box::new(generator),
            resident: DashSet::with_hasher(FxBuildHasher),
            loads: AtomicU64::new(0),
        }
    }

    pub fn mark_resident(&self, environment: EnvironmentId, chunk: ChunkPos) {
        self.resident.insert((environment, chunk));
    }

    pub fn unload(&self, environment: EnvironmentId, chunk: ChunkPos) {
        self.resident.remove(&(environment, chunk));
    }

    /// How many chunks were generated through `load`.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for ChunkedWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedWorld")
            .field("resident", &self.resident.len())
            .field("loads", &self.load_count())
            .finish_non_exhaustive()
    }
}

impl ChunkSource for ChunkedWorld {
    fn is_resident(&self, environment: &Environment, chunk: ChunkPos) -> bool {
        self.resident.contains(&(environment.id, chunk))
    }

    fn load(&self, environment: &Environment, chunk: ChunkPos) -> Option<ChunkSnapshot> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.resident.insert((environment.id, chunk));
        Some((self.generator)(environment, chunk))
    }
}

// ---------------------------------------------------------------------------
// ChunkCache
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct CacheEntry {
    snapshot: Arc<ChunkSnapshot>,
    touched: Instant,
}

/// Concurrent, self-expiring snapshot cache.
#[derive(Debug)]
pub struct ChunkCache {
    ttl: Duration,
    entries: DashMap<(EnvironmentId, ChunkPos), CacheEntry, FxBuildHasher>,
    inserts: AtomicU64,
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_TTL)
    }
}

impl ChunkCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::with_hasher(FxBuildHasher),
            inserts: AtomicU64::new(0),
        }
    }

    /// The process-wide cache.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// A live snapshot, refreshing its expiry. Expired entries are removed.
    pub fn get(&self, environment: EnvironmentId, chunk: ChunkPos) -> Option<Arc<ChunkSnapshot>> {
        let key = (environment, chunk);
        let now = Instant::now();
        {
            let mut entry = self.entries.get_mut(&key)?;
            if now.duration_since(entry.touched) <= self.ttl {
                entry.touched = now;
                return Some(Arc::clone(&entry.snapshot));
            }
        }
        self.entries
            .remove_if(&key, |_, entry| now.duration_since(entry.touched) > self.ttl);
        None
    }

    pub fn insert(&self, environment: EnvironmentId, snapshot: Arc<ChunkSnapshot>) {
        let key = (environment, snapshot.pos());
        self.entries.insert(
            key,
            CacheEntry {
                snapshot,
                touched: Instant::now(),
            },
        );

        let inserts = self.inserts.fetch_add(1, Ordering::Relaxed) + 1;
        if inserts % PURGE_INTERVAL == 0 {
            self.purge_expired();
        }
    }

    /// Forget a chunk so the next probe re-snapshots it. Returns whether it
    /// was cached.
    pub fn invalidate_chunk(&self, environment: EnvironmentId, chunk: ChunkPos) -> bool {
        self.entries.remove(&(environment, chunk)).is_some()
    }

    /// Forget every chunk of an environment.
    pub fn invalidate_environment(&self, environment: EnvironmentId) {
        self.entries.retain(|(env, _), _| *env != environment);
    }

    /// Drop entries idle for longer than the TTL. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched) <= self.ttl);
        let purged = before.saturating_sub(self.entries.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "purged expired chunk snapshots");
        }
        purged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Providers
// ---------------------------------------------------------------------------

fn cell_at(snapshot: &ChunkSnapshot, position: &Position) -> Option<CellInfo> {
    snapshot.get(position.block()).map(VoxelKind::cell)
}

/// Reads cached or resident chunks only. Unloaded chunks are unknown.
pub struct FailingProvider {
    source: Arc<dyn ChunkSource>,
    cache: Arc<ChunkCache>,
}

impl FailingProvider {
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        Self::with_cache(source, ChunkCache::global())
    }

    pub fn with_cache(source: Arc<dyn ChunkSource>, cache: Arc<ChunkCache>) -> Self {
        Self { source, cache }
    }

    fn snapshot(&self, position: &Position) -> Option<Arc<ChunkSnapshot>> {
        let environment = position.environment();
        let chunk = ChunkPos::containing(position.block());
        if let Some(snapshot) = self.cache.get(environment.id, chunk) {
            return Some(snapshot);
        }
        if !self.source.is_resident(environment, chunk) {
            return None;
        }
        let snapshot = Arc::new(self.source.load(environment, chunk)?);
        self.cache.insert(environment.id, Arc::clone(&snapshot));
        Some(snapshot)
    }
}

impl WorldProvider for FailingProvider {
    fn probe(&self, position: &Position) -> Option<CellInfo> {
        let snapshot = self.snapshot(position)?;
        cell_at(&snapshot, position)
    }
}

/// Loads missing chunks through the source and caches them.
pub struct LoadingProvider {
    source: Arc<dyn ChunkSource>,
    cache: Arc<ChunkCache>,
}

impl LoadingProvider {
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        Self::with_cache(source, ChunkCache::global())
    }

    pub fn with_cache(source: Arc<dyn ChunkSource>, cache: Arc<ChunkCache>) -> Self {
        Self { source, cache }
    }

    fn snapshot(&self, position: &Position) -> Option<Arc<ChunkSnapshot>> {
        let environment = position.environment();
        let chunk = ChunkPos::containing(position.block());
        if let Some(snapshot) = self.cache.get(environment.id, chunk) {
            return Some(snapshot);
        }
        let snapshot = Arc::new(self.source.load(environment, chunk)?);
        self.cache.insert(environment.id, Arc::clone(&snapshot));
        Some(snapshot)
    }
}

impl WorldProvider for LoadingProvider {
    fn probe(&self, position: &Position) -> Option<CellInfo> {
        let snapshot = self.snapshot(position)?;
        cell_at(&snapshot, position)
    }
}

/// The provider matching `config.loading_chunks`, backed by `cache`.
pub fn provider_for(
    config: &PathfinderConfig,
    source: Arc<dyn ChunkSource>,
    cache: Arc<ChunkCache>,
) -> Arc<dyn WorldProvider> {
    if config.loading_chunks {
        Arc::new(LoadingProvider::with_cache(source, cache))
    } else {
        Arc::new(FailingProvider::with_cache(source, cache))
    }
}
