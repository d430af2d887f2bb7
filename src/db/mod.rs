pub mod models;
pub mod stat_cache;

pub use stat_cache::SqliteStatCache;
