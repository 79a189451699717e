// ===============================
// src/config.rs
// ===============================
/*
=============================================================================
Project : ichimoku_mm — Ichimoku-driven market maker for a FUTURE/ETF pair
Module  : config.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Quotes the FUTURE around a spread-widened, inventory-skewed touch,
          hedges every fill on the ETF, enforces a hard position limit, and
          uses an Ichimoku signal plus a profit-taking overlay to refresh
          quotes. Exposes Prometheus metrics and records JSONL events.
=============================================================================
*/
use clap::Parser;
use dotenvy::dotenv;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be positive, got {1}")]
    NotPositive(&'static str, i64),
    #[error("MINIMUM_BID ({min_bid}) must be below MAXIMUM_ASK ({max_ask})")]
    PriceBounds { min_bid: i64, max_ask: i64 },
}

/// Strategy parameters. Semua harga dalam minor unit (cents), volume dalam lot.
#[derive(clap::Args, Clone, Debug)]
pub struct TraderParams {
    #[arg(long, env = "LOT_SIZE", default_value_t = 200)]
    pub lot_size: i64,
    #[arg(long, env = "POSITION_LIMIT", default_value_t = 100)]
    pub position_limit: i64,
    /// |position| at or above this turns on the profit-taking overlay
    #[arg(long, env = "UNLOAD_THRESHOLD", default_value_t = 25)]
    pub unload_threshold: i64,
    #[arg(long, env = "TICK_SIZE", default_value_t = 100)]
    pub tick_size: i64,

    #[arg(long, env = "CONVERSION_PERIOD", default_value_t = 9)]
    pub conversion_period: usize,
    #[arg(long, env = "BASELINE_PERIOD", default_value_t = 26)]
    pub baseline_period: usize,
    #[arg(long, env = "LEADING_SPAN_B_PERIOD", default_value_t = 52)]
    pub leading_span_b_period: usize,

    #[arg(long, env = "MINIMUM_BID", default_value_t = 1)]
    pub minimum_bid: i64,
    #[arg(long, env = "MAXIMUM_ASK", default_value_t = 2_147_483_647)]
    pub maximum_ask: i64,

    /// Gate the Sell branch on indicator warm-up too (Buy is always gated)
    #[arg(long, env = "SYMMETRIC_SIGNAL_GATING")]
    pub symmetric_signal_gating: bool,
}

impl Default for TraderParams {
    fn default() -> Self {
        Self {
            lot_size: 200,
            position_limit: 100,
            unload_threshold: 25,
            tick_size: 100,
            conversion_period: 9,
            baseline_period: 26,
            leading_span_b_period: 52,
            minimum_bid: 1,
            maximum_ask: 2_147_483_647,
            symmetric_signal_gating: false,
        }
    }
}

impl TraderParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positives = [
            ("LOT_SIZE", self.lot_size),
            ("POSITION_LIMIT", self.position_limit),
            ("TICK_SIZE", self.tick_size),
            ("CONVERSION_PERIOD", self.conversion_period as i64),
            ("BASELINE_PERIOD", self.baseline_period as i64),
            ("LEADING_SPAN_B_PERIOD", self.leading_span_b_period as i64),
        ];
        for (name, v) in positives {
            if v <= 0 {
                return Err(ConfigError::NotPositive(name, v));
            }
        }
        if self.minimum_bid >= self.maximum_ask {
            return Err(ConfigError::PriceBounds { min_bid: self.minimum_bid, max_ask: self.maximum_ask });
        }
        Ok(())
    }

    /// Lowest tick-aligned price strictly above the exchange minimum bid.
    pub fn min_bid_nearest_tick(&self) -> i64 {
        (self.minimum_bid + self.tick_size) / self.tick_size * self.tick_size
    }

    /// Highest tick-aligned price not above the exchange maximum ask.
    pub fn max_ask_nearest_tick(&self) -> i64 {
        self.maximum_ask / self.tick_size * self.tick_size
    }
}

#[derive(Parser, Clone, Debug)]
#[command(name = "ichimoku_mm", about = "Ichimoku market maker with ETF hedging")]
pub struct Args {
    // files/metrics
    #[arg(long, env = "RECORD_FILE")]
    pub record_file: Option<String>,
    #[arg(long, env = "METRICS_PORT", default_value_t = 9898)]
    pub metrics_port: u16,

    // mock collaborators
    #[arg(long, env = "FEED_INTERVAL_MS", default_value_t = 250)]
    pub feed_interval_ms: u64,
    #[arg(long, env = "FILL_MS", default_value_t = 100)]
    pub fill_ms: u64,
    #[arg(long, env = "FILL_PROBABILITY", default_value_t = 0.05)]
    pub fill_probability: f64,

    #[arg(long, env = "HEARTBEAT_SECS", default_value_t = 5)]
    pub heartbeat_secs: u64,

    #[command(flatten)]
    pub params: TraderParams,
}

pub fn load() -> Result<(Args, TraderParams), ConfigError> {
    // .env dulu, supaya env = "..." di atas ikut terbaca
    let _ = dotenv();

    let args = Args::parse();
    args.params.validate()?;
    let params = args.params.clone();
    Ok((args, params))
}
