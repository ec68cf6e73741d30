mod statistics_store;

pub use statistics_store::StatisticsStore;
