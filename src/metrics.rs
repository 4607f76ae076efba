//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `market_transitions_total` - Successful state transitions applied
//! - `market_parcels_minted_total` - Parcels minted
//! - `market_sales_total` - Completed purchases
//! - `market_volume_total` - Accumulated sale value
//! - `market_active_listings` - Currently Active listings
//! - `market_apply_duration_seconds` - Histogram of apply-section latencies
//!
//! Metrics live on a per-instance registry so independent ledgers (and
//! tests) can coexist in one process.

use prometheus::{Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful transitions applied
    pub transitions_total: IntCounter,

    /// Parcels minted
    pub parcels_minted_total: IntCounter,

    /// Completed purchases
    pub sales_total: IntCounter,

    /// Accumulated sale value
    pub volume_total: IntCounter,

    /// Currently Active listings
    pub active_listings: IntGauge,

    /// Apply-section latency histogram
    pub apply_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transitions_total = IntCounter::with_opts(Opts::new(
            "market_transitions_total",
            "Successful state transitions applied",
        ))?;
        registry.register(Box::new(transitions_total.clone()))?;

        let parcels_minted_total = IntCounter::with_opts(Opts::new(
            "market_parcels_minted_total",
            "Parcels minted",
        ))?;
        registry.register(Box::new(parcels_minted_total.clone()))?;

        let sales_total = IntCounter::with_opts(Opts::new(
            "market_sales_total",
            "Completed purchases",
        ))?;
        registry.register(Box::new(sales_total.clone()))?;

        let volume_total = IntCounter::with_opts(Opts::new(
            "market_volume_total",
            "Accumulated sale value",
        ))?;
        registry.register(Box::new(volume_total.clone()))?;

        let active_listings = IntGauge::with_opts(Opts::new(
            "market_active_listings",
            "Currently Active listings",
        ))?;
        registry.register(Box::new(active_listings.clone()))?;

        let apply_duration = Histogram::with_opts(
            HistogramOpts::new(
                "market_apply_duration_seconds",
                "Histogram of apply-section latencies",
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250]),
        )?;
        registry.register(Box::new(apply_duration.clone()))?;

        Ok(Self {
            transitions_total,
            parcels_minted_total,
            sales_total,
            volume_total,
            active_listings,
            apply_duration,
            registry,
        })
    }

    /// Record a successful transition
    pub fn record_transition(&self, duration_seconds: f64) {
        self.transitions_total.inc();
        self.apply_duration.observe(duration_seconds);
    }

    /// Record a mint
    pub fn record_mint(&self) {
        self.parcels_minted_total.inc();
    }

    /// Record a completed sale
    pub fn record_sale(&self, price: u64) {
        self.sales_total.inc();
        self.volume_total.inc_by(price);
    }

    /// Record a listing becoming Active
    pub fn record_listing_opened(&self) {
        self.active_listings.inc();
    }

    /// Record an Active listing reaching a terminal status
    pub fn record_listing_closed(&self) {
        self.active_listings.dec();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
