// Regional visited-set deduplication.
//
// Space is cut into cubic regions of `region_size` cells per side. Each
// region holds a Bloom filter and an exact set of the cells examined in it.
// A cell counts as already examined only when the Bloom filter claims it and
// the exact set confirms it, so genuinely new cells are never rejected and
// most novel cells skip the exact lookup.
//
// Regions are keyed by `(SearchId, region coords)` in one process-wide
// `DashMap`, so concurrent searches never see each other's marks. Entries
// record their last touch; `purge_expired` drops regions idle longer than the
// TTL and runs on its own every `PURGE_INTERVAL` marks. A finishing search
// drops its own regions through `evict_search`.
//
// Region coordinates use Euclidean division: cell -1 lives in region -1, not
// region 0, so every region is a full cube in negative space too.
//
// **Known behavior: expiry forgets.** If a region expires while its search
// is still running, cells in it can be examined again. The search keeps its
// own exact set of admitted cells, so this costs repeated filter work, never
// a duplicate node.

use crate::bloom::BloomFilter;
use crate::geometry::BlockPos;
use crate::search::SearchId;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_REGION_SIZE: i32 = 12;
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
const PURGE_INTERVAL: u64 = 4096;
const BLOOM_FALSE_POSITIVE_RATE: f64 = 0.01;

static SHARED: Lazy<Arc<RegionStore>> = Lazy::new(|| Arc::new(RegionStore::default()));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct RegionKey {
    search: SearchId,
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Debug)]
struct Region {
    bloom: BloomFilter,
    exact: FxHashSet<BlockPos>,
    touched: Instant,
}

#[derive(Debug)]
pub struct RegionStore {
    region_size: i32,
    ttl: Duration,
    regions: DashMap<RegionKey, Region, FxBuildHasher>,
    marks: AtomicU64,
}

impl Default for RegionStore {
    fn default() -> Self {
        Self::new(DEFAULT_REGION_SIZE, DEFAULT_TTL)
    }
}

impl RegionStore {
    /// `region_size` is clamped to at least 1.
    pub fn new(region_size: i32, ttl: Duration) -> Self {
        Self {
            region_size: region_size.max(1),
            ttl,
            regions: DashMap::with_hasher(FxBuildHasher),
            marks: AtomicU64::new(0),
        }
    }

    /// The process-wide store.
    pub fn shared() -> Arc<Self> {
        Arc::clone(&SHARED)
    }

    pub fn region_size(&self) -> i32 {
        self.region_size
    }

    fn key(&self, search: SearchId, block: BlockPos) -> RegionKey {
        let region = self.region_of(block);
        RegionKey {
            search,
            x: region.x,
            y: region.y,
            z: region.z,
        }
    }

    /// Region coordinates of a cell.
    pub fn region_of(&self, block: BlockPos) -> BlockPos {
        let size = self.region_size;
        BlockPos::new(
            block.x.div_euclid(size),
            block.y.div_euclid(size),
            block.z.div_euclid(size),
        )
    }

    /// Whether `block` was already marked by `search`.
    pub fn is_examined(&self, search: SearchId, block: BlockPos) -> bool {
        match self.regions.get_mut(&self.key(search, block)) {
            Some(mut region) => {
                region.touched = Instant::now();
                region.bloom.might_contain(&block) && region.exact.contains(&block)
            }
            None => false,
        }
    }

    /// Record `block` as examined by `search`.
    pub fn mark_examined(&self, search: SearchId, block: BlockPos) {
        {
            let cells = (self.region_size as usize).pow(3);
            let mut region = self
                .regions
                .entry(self.key(search, block))
                .or_insert_with(|| Region {
                    bloom: BloomFilter::with_rate(cells, BLOOM_FALSE_POSITIVE_RATE),
                    exact: FxHashSet::default(),
                    touched: Instant::now(),
                });
            region.bloom.insert(&block);
            region.exact.insert(block);
            region.touched = Instant::now();
        }

        // The entry guard above must be released before purging.
        let marks = self.marks.fetch_add(1, Ordering::Relaxed) + 1;
        if marks % PURGE_INTERVAL == 0 {
            self.purge_expired();
        }
    }

    /// Drop regions idle longer than the TTL. Returns how many went.
    pub fn purge_expired(&self) -> usize {
        let before = self.regions.len();
        let ttl = self.ttl;
        self.regions.retain(|_, region| region.touched.elapsed() < ttl);
        let purged = before.saturating_sub(self.regions.len());
        if purged > 0 {
            tracing::debug!(purged, remaining = self.regions.len(), "purged idle regions");
        }
        purged
    }

    /// Drop every region belonging to `search`.
    pub fn evict_search(&self, search: SearchId) {
        self.regions.retain(|key, _| key.search != search);
    }

    /// Regions currently held for `search`.
    pub fn region_count(&self, search: SearchId) -> usize {
        self.regions.iter().filter(|entry| entry.key().search == search).count()
    }

    /// Regions currently held across all searches.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
