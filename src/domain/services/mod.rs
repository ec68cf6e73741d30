mod statistics;

pub use statistics::{CircuitSnapshot, RequestCounts, ServiceStatistics};
