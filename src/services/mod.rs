pub mod bars;
pub mod cache;
pub mod narrative;
pub mod predictor;
pub mod redis_cache;
pub mod signals;
pub mod tasks;

pub use bars::{BarStore, CachedBarStore, HttpBarStore};
pub use cache::{Cache, CacheProvider, CacheProviderExt, MemoryCacheProvider};
pub use narrative::{HttpNarrativeService, NarrativeService, NewsItem, NewsSource};
pub use predictor::Predictor;
pub use redis_cache::RedisCacheProvider;
pub use tasks::TaskOrchestrator;
