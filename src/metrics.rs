// ===============================
// src/metrics.rs
// ===============================
use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::service::{make_service_fn, service_fn};
use hyper::{header, Body, Method, Request, Response, Server, StatusCode};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};
use tracing::{error, info};

use crate::config::TraderParams;

// Single custom registry (we register everything here)
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

// -------- Market data --------
pub static BOOKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("order_books_total", "order book updates"), &["instrument"]).unwrap()
});

pub static TRADE_TICKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("trade_ticks_total", "trade tick updates"), &["instrument"]).unwrap()
});

pub static STALE_BOOKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("stale_updates_total", "out-of-order market data dropped"),
        &["instrument"],
    )
    .unwrap()
});

pub static SIGNALS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("ichimoku_signals_total", "indicator signals"), &["signal"]).unwrap()
});

pub static SPREAD_ESTIMATE: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("spread_estimate", "weighted half-spread (minor units)").unwrap());

// -------- Orders & executions --------
pub static INSTRUCTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("instructions_total", "instructions sent"), &["kind"]).unwrap()
});

pub static EXECS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(Opts::new("exec_events_total", "execution events received"), &["kind"]).unwrap()
});

pub static FILLS_OVER_LIMIT: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("fills_over_limit_total", "fills not applied to position (risk)").unwrap()
});

pub static LIVE_ORDERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("live_orders", "tracked live orders"), &["side"]).unwrap()
});

pub static POSITION: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("position_lots", "FUTURE position (lots)").unwrap());

pub static HEDGES: Lazy<IntGauge> =
    Lazy::new(|| IntGauge::new("hedge_lots", "net ETF hedge (lots)").unwrap());

// ---- Config visibility ----
pub static CONFIG_PARAM: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(Opts::new("config_param", "configured strategy parameter"), &["name"]).unwrap()
});

pub fn init() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BOOKS.clone()),
        Box::new(TRADE_TICKS.clone()),
        Box::new(STALE_BOOKS.clone()),
        Box::new(SIGNALS.clone()),
        Box::new(SPREAD_ESTIMATE.clone()),
        Box::new(INSTRUCTIONS.clone()),
        Box::new(EXECS.clone()),
        Box::new(FILLS_OVER_LIMIT.clone()),
        Box::new(LIVE_ORDERS.clone()),
        Box::new(POSITION.clone()),
        Box::new(HEDGES.clone()),
        Box::new(CONFIG_PARAM.clone()),
    ];
    for c in collectors {
        // AlreadyReg is fine (init called twice in tests)
        let _ = REGISTRY.register(c);
    }
}

pub fn export_config(p: &TraderParams) {
    let values = [
        ("lot_size", p.lot_size),
        ("position_limit", p.position_limit),
        ("unload_threshold", p.unload_threshold),
        ("tick_size", p.tick_size),
        ("conversion_period", p.conversion_period as i64),
        ("baseline_period", p.baseline_period as i64),
        ("leading_span_b_period", p.leading_span_b_period as i64),
        ("symmetric_signal_gating", p.symmetric_signal_gating as i64),
    ];
    for (name, v) in values {
        CONFIG_PARAM.with_label_values(&[name]).set(v);
    }
}

// Encode all metrics in Prometheus text format
pub fn encode_metrics() -> Vec<u8> {
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if encoder.encode(&REGISTRY.gather(), &mut buf).is_err() || buf.is_empty() {
        buf.extend_from_slice(b"# no metrics\n");
    }
    buf
}

async fn handle(req: Request<Body>) -> Result<Response<Body>, Infallible> {
    let resp = match (req.method(), req.uri().path()) {
        (&Method::GET, "/") | (&Method::GET, "/metrics") => Response::builder()
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(encode_metrics())),
        _ => Response::builder().status(StatusCode::NOT_FOUND).body(Body::empty()),
    };
    Ok(resp.unwrap_or_else(|_| Response::new(Body::empty())))
}

pub async fn serve_metrics(port: u16) {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let make_svc = make_service_fn(|_conn| async { Ok::<_, Infallible>(service_fn(handle)) });

    let builder = match Server::try_bind(&addr) {
        Ok(b) => b,
        Err(e) => {
            error!(%addr, ?e, "metrics bind failed");
            return;
        }
    };
    info!(%addr, "metrics listening on / and /metrics");
    if let Err(e) = builder.serve(make_svc).await {
        error!(?e, "metrics server stopped");
    }
}
