// Concrete world providers for tickpath (tickpath_grid).
//
// Implements `tickpath_core::WorldProvider` over two kinds of host world
// data. Nothing in here is needed by the search itself; hosts with their
// own storage implement the trait directly (or pass a closure).
//
// Module overview:
// - `world.rs`: `VoxelKind` and the dense, origin-anchored `VoxelGrid`.
// - `chunk.rs`: `ChunkSource`, `ChunkedWorld`, the process-wide expiring
//               `ChunkCache`, and the failing/loading chunk providers.
// - `filter.rs`: filters keyed on voxel kinds (`WaterFilter`).
//
// End-to-end search scenarios live in `tests/search_scenarios.rs`.

pub mod chunk;
pub mod filter;
pub mod world;

pub use chunk::{
    ChunkCache, ChunkPos, ChunkSnapshot, ChunkSource, ChunkedWorld, FailingProvider,
    LoadingProvider, provider_for,
};
pub use filter::WaterFilter;
pub use world::{VoxelGrid, VoxelKind};
