//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the commander-ladder rating
//! service using Prometheus metrics.

use crate::types::{League, OutcomeKind};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the ladder service
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Service-level metrics
    service_metrics: ServiceMetrics,

    /// Game processing and rating metrics
    rating_metrics: RatingMetrics,

    /// Leaderboard metrics
    leaderboard_metrics: LeaderboardMetrics,
}

/// Service-level metrics
#[derive(Clone)]
pub struct ServiceMetrics {
    /// Service uptime in seconds
    pub uptime_seconds: IntGauge,

    /// Number of registered players
    pub players_registered: IntGauge,
}

/// Game processing and rating metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Games whose outcome was applied, by outcome kind
    pub games_processed_total: IntCounterVec,

    /// Games refused before or during rating, by reason
    pub games_rejected_total: IntCounterVec,

    /// Time spent in the rating calculator
    pub rating_calculation_duration: Histogram,

    /// Match quality reported by the calculator
    pub match_quality: Histogram,
}

/// Leaderboard metrics
#[derive(Clone)]
pub struct LeaderboardMetrics {
    /// Total leaderboard rebuilds
    pub rebuilds_total: IntCounter,

    /// Entries per league in the last snapshot
    pub league_size: IntGaugeVec,

    /// Unix time of the last rebuild
    pub last_rebuild_timestamp: IntGauge,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let service_metrics = ServiceMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let leaderboard_metrics = LeaderboardMetrics::new(&registry)?;

        Ok(Self {
            registry,
            service_metrics,
            rating_metrics,
            leaderboard_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn service(&self) -> &ServiceMetrics {
        &self.service_metrics
    }

    pub fn rating(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn leaderboard(&self) -> &LeaderboardMetrics {
        &self.leaderboard_metrics
    }

    /// Record a successfully applied game
    pub fn record_game_processed(&self, outcome: OutcomeKind, match_quality: f64) {
        self.rating_metrics
            .games_processed_total
            .with_label_values(&[outcome.as_label()])
            .inc();
        self.rating_metrics.match_quality.observe(match_quality);
    }

    /// Record a refused game
    pub fn record_game_rejected(&self, reason: &str) {
        self.rating_metrics
            .games_rejected_total
            .with_label_values(&[reason])
            .inc();
    }

    /// Record rating calculation duration
    pub fn record_rating_calculation(&self, duration: Duration) {
        self.rating_metrics
            .rating_calculation_duration
            .observe(duration.as_secs_f64());
    }

    /// Record a leaderboard rebuild and its league sizes
    pub fn record_leaderboard_rebuild(&self, sizes: &[(League, usize)], unix_time: i64) {
        self.leaderboard_metrics.rebuilds_total.inc();
        for (league, size) in sizes {
            let label = league.to_string();
            self.leaderboard_metrics
                .league_size
                .with_label_values(&[label.as_str()])
                .set(*size as i64);
        }
        self.leaderboard_metrics
            .last_rebuild_timestamp
            .set(unix_time);
    }

    pub fn set_players_registered(&self, count: usize) {
        self.service_metrics.players_registered.set(count as i64);
    }

    pub fn set_uptime(&self, uptime: Duration) {
        self.service_metrics
            .uptime_seconds
            .set(uptime.as_secs() as i64);
    }

    /// Encode all registered metrics in the Prometheus text format
    pub fn render(&self) -> Result<String> {
        let metric_families = self.registry.gather();
        TextEncoder::new()
            .encode_to_string(&metric_families)
            .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl ServiceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let uptime_seconds = IntGauge::new(
            "commander_ladder_uptime_seconds",
            "Service uptime in seconds",
        )?;
        registry.register(Box::new(uptime_seconds.clone()))?;

        let players_registered = IntGauge::new(
            "commander_ladder_players_registered",
            "Number of registered players",
        )?;
        registry.register(Box::new(players_registered.clone()))?;

        Ok(Self {
            uptime_seconds,
            players_registered,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let games_processed_total = IntCounterVec::new(
            Opts::new(
                "commander_ladder_games_processed_total",
                "Total games applied to ratings",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(games_processed_total.clone()))?;

        let games_rejected_total = IntCounterVec::new(
            Opts::new(
                "commander_ladder_games_rejected_total",
                "Total games refused",
            ),
            &["reason"],
        )?;
        registry.register(Box::new(games_rejected_total.clone()))?;

        let rating_calculation_duration = Histogram::with_opts(
            HistogramOpts::new(
                "commander_ladder_rating_calculation_duration_seconds",
                "Rating calculation time",
            )
            .buckets(vec![0.00001, 0.0001, 0.001, 0.005, 0.01, 0.05, 0.1]),
        )?;
        registry.register(Box::new(rating_calculation_duration.clone()))?;

        let match_quality = Histogram::with_opts(
            HistogramOpts::new(
                "commander_ladder_match_quality",
                "Match quality of processed games",
            )
            .buckets(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0]),
        )?;
        registry.register(Box::new(match_quality.clone()))?;

        Ok(Self {
            games_processed_total,
            games_rejected_total,
            rating_calculation_duration,
            match_quality,
        })
    }
}

impl LeaderboardMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rebuilds_total = IntCounter::new(
            "commander_ladder_leaderboard_rebuilds_total",
            "Total leaderboard rebuilds",
        )?;
        registry.register(Box::new(rebuilds_total.clone()))?;

        let league_size = IntGaugeVec::new(
            Opts::new(
                "commander_ladder_leaderboard_size",
                "Players per league in the last leaderboard",
            ),
            &["league"],
        )?;
        registry.register(Box::new(league_size.clone()))?;

        let last_rebuild_timestamp = IntGauge::new(
            "commander_ladder_leaderboard_last_rebuild_timestamp",
            "Unix time of the last leaderboard rebuild",
        )?;
        registry.register(Box::new(last_rebuild_timestamp.clone()))?;

        Ok(Self {
            rebuilds_total,
            league_size,
            last_rebuild_timestamp,
        })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}
