//! Metrics for the commander-ladder service
//!
//! Prometheus counters and gauges for game processing, rating calculation and
//! leaderboard rebuilds.

pub mod collector;

pub use collector::{
    LeaderboardMetrics, MetricsCollector, MetricsTimer, RatingMetrics, ServiceMetrics,
};
