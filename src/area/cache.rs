use async_trait::async_trait;

use crate::error::Result;
use crate::types::CachedAreaStat;

/// Keyed store for area statistics. Upserts are last-writer-wins by area name.
/// Freshness is judged by the caller; stores return whatever they hold.
#[async_trait]
pub trait AreaStatCache: Send + Sync {
    async fn get(&self, area_name: &str) -> Result<Option<CachedAreaStat>>;

    async fn upsert(&self, entry: &CachedAreaStat) -> Result<()>;

    fn backend(&self) -> &'static str;
}
