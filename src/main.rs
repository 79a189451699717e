// ===============================
// src/main.rs
// ===============================
/*
=============================================================================
Project : ichimoku_mm — Ichimoku-driven market maker for a FUTURE/ETF pair
Module  : main.rs
Version : 0.1.0
License : MIT (see LICENSE)

Summary : Quotes the FUTURE around a spread-widened, inventory-skewed touch,
          hedges every fill on the ETF, enforces a hard position limit, and
          uses an Ichimoku signal plus a profit-taking overlay to refresh
          quotes. Exposes Prometheus metrics and records JSONL events.
=============================================================================
*/
mod domain;
mod config;
mod metrics;
mod recorder;
mod feed;             // mock market data (FUTURE + ETF)
mod gateway;          // mock exchange (ack / fill / cancel / hedge)
mod window;
mod ichimoku;
mod spread;
mod pricing;
mod risk;
mod positions;
mod orders;
mod strategy;

use tokio::{
    select,
    sync::{mpsc, watch},
    time::{interval, Duration},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::domain::{Event, Inbound, Instruction, TraderSnapshot};

#[tokio::main]
async fn main() {
    // ---- Logging ----
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ---- Load config & params ----
    let (args, params) = match config::load() {
        Ok(v) => v,
        Err(e) => {
            error!(%e, "invalid configuration");
            std::process::exit(2);
        }
    };

    // ---- Metrics ----
    metrics::init();
    metrics::export_config(&params);
    tokio::spawn(metrics::serve_metrics(args.metrics_port));

    info!(
        lot_size = params.lot_size,
        position_limit = params.position_limit,
        unload_threshold = params.unload_threshold,
        tick_size = params.tick_size,
        periods = ?(params.conversion_period, params.baseline_period, params.leading_span_b_period),
        symmetric_signal_gating = params.symmetric_signal_gating,
        record_file = ?args.record_file,
        "startup config"
    );

    // ---- Buses ----
    // inbound: feed + gateway -> trader (satu consumer, jadi serial)
    let (in_tx, in_rx) = mpsc::channel::<Inbound>(4096);
    // outbound tidak boleh blok trader, gateway juga kirim balik ke inbound
    let (out_tx, out_rx) = mpsc::unbounded_channel::<Instruction>();
    let (etf_tx, etf_rx) = watch::channel::<feed::EtfTouch>((0, 0));
    let (snap_tx, mut snap_rx) = watch::channel::<TraderSnapshot>(TraderSnapshot::default());

    // ---- Recorder (optional) ----
    let (rec_tx, rec_rx) = mpsc::channel::<Event>(8192);
    if let Some(path) = args.record_file.clone() {
        tokio::spawn(recorder::run(rec_rx, path));
    }

    // ---- Collaborators ----
    tokio::spawn(feed::run_mock(in_tx.clone(), etf_tx, args.feed_interval_ms));
    tokio::spawn(gateway::run_mock(
        out_rx,
        in_tx,
        etf_rx,
        gateway::GatewayCfg { fill_ms: args.fill_ms, fill_probability: args.fill_probability, fee_per_lot: 1 },
    ));

    // ---- Trader ----
    let trader = tokio::spawn(strategy::run(in_rx, out_tx, rec_tx, snap_tx, params));

    // ---- Heartbeat ----
    let mut hb = interval(Duration::from_secs(args.heartbeat_secs.max(1)));
    loop {
        select! {
            _ = hb.tick() => {
                let s = snap_rx.borrow_and_update().clone();
                info!(
                    position = s.position,
                    hedges = s.hedges,
                    asks = ?s.ask_ids,
                    bids = ?s.bid_ids,
                    signal = ?s.last_signal,
                    books = s.books_seen,
                    "heartbeat"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("ctrl-c, shutting down");
                break;
            }
        }
        if trader.is_finished() {
            info!("trader task finished");
            break;
        }
    }
}
