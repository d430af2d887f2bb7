pub mod area_store;
pub mod lookup_stats;

pub use area_store::MemoryStatCache;
pub use lookup_stats::LookupStats;
