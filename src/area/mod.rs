pub mod cache;
pub mod clock;
pub mod locality;
pub mod normalizer;
pub mod sources;

#[cfg(test)]
pub mod testing;

pub use cache::AreaStatCache;
pub use normalizer::AreaPriceNormalizer;
