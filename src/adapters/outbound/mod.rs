mod dashmap_statistics_store;
mod redis_statistics_store;
mod sqlite_statistics_store;

pub use dashmap_statistics_store::DashMapStatisticsStore;
pub use redis_statistics_store::RedisStatisticsStore;
pub use sqlite_statistics_store::SqliteStatisticsStore;
