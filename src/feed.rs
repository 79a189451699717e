// ===============================
// src/feed.rs
// ===============================
//
// Mock market data: random walk FUTURE + ETF yang berkorelasi.
// - tiap interval: satu order book per instrument (5 level per sisi)
// - tiap TRADE_TICK_EVERY book: trade ticks di level terbaik
// - touch ETF terakhir juga dikirim lewat watch channel untuk mock gateway
//
// Harga dalam cents, tick 100 (sama dengan default TICK_SIZE).
//
use rand::Rng;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::domain::{Inbound, Instrument, OrderBook, PriceVolumeArray, TOP_LEVEL_COUNT};

const TICK: i64 = 100;
const TRADE_TICK_EVERY: u64 = 4;

/// Best bid / best ask of the ETF, consumed by the mock gateway for hedges.
pub type EtfTouch = (i64, i64);

/// Five-level book around `bid` with a one-tick spread and random depth.
pub fn synth_book<R: Rng>(rng: &mut R, instrument: Instrument, seq: u64, bid: i64) -> OrderBook {
    let mut ask_prices: PriceVolumeArray = [0; TOP_LEVEL_COUNT];
    let mut ask_volumes: PriceVolumeArray = [0; TOP_LEVEL_COUNT];
    let mut bid_prices: PriceVolumeArray = [0; TOP_LEVEL_COUNT];
    let mut bid_volumes: PriceVolumeArray = [0; TOP_LEVEL_COUNT];
    for i in 0..TOP_LEVEL_COUNT {
        let off = i as i64 * TICK;
        ask_prices[i] = bid + TICK + off;
        bid_prices[i] = (bid - off).max(0);
        ask_volumes[i] = rng.gen_range(5..=150);
        bid_volumes[i] = if bid_prices[i] > 0 { rng.gen_range(5..=150) } else { 0 };
    }
    OrderBook { instrument, sequence_number: seq, ask_prices, ask_volumes, bid_prices, bid_volumes }
}

fn synth_ticks<R: Rng>(rng: &mut R, book: &OrderBook) -> OrderBook {
    let mut t = book.clone();
    t.ask_prices[1..].iter_mut().for_each(|x| *x = 0);
    t.bid_prices[1..].iter_mut().for_each(|x| *x = 0);
    t.ask_volumes = [rng.gen_range(0..=20), 0, 0, 0, 0];
    t.bid_volumes = [rng.gen_range(0..=20), 0, 0, 0, 0];
    t
}

pub async fn run_mock(in_tx: mpsc::Sender<Inbound>, etf_tx: watch::Sender<EtfTouch>, interval_ms: u64) {
    let mut fut_bid: i64 = 100_00;
    // ETF ikut FUTURE dengan basis kecil
    let mut basis: i64 = 0;
    let mut seq: u64 = 0;

    let mut tick = interval(Duration::from_millis(interval_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_ms, "mock feed started");

    loop {
        tick.tick().await;
        seq += 1;

        // jangan simpan ThreadRng melewati .await
        let (future, etf, ticks) = {
            let mut rng = rand::thread_rng();
            fut_bid = (fut_bid + rng.gen_range(-2..=2) * TICK).max(10 * TICK);
            basis = (basis + rng.gen_range(-1..=1) * TICK).clamp(-3 * TICK, 3 * TICK);
            let future = synth_book(&mut rng, Instrument::Future, seq, fut_bid);
            let etf = synth_book(&mut rng, Instrument::Etf, seq, (fut_bid + basis).max(TICK));
            let ticks = if seq % TRADE_TICK_EVERY == 0 {
                Some((synth_ticks(&mut rng, &future), synth_ticks(&mut rng, &etf)))
            } else {
                None
            };
            (future, etf, ticks)
        };

        let _ = etf_tx.send((etf.best_bid(), etf.best_ask()));
        let mut batch = vec![Inbound::OrderBook(etf), Inbound::OrderBook(future)];
        if let Some((ft, et)) = ticks {
            batch.push(Inbound::TradeTicks(et));
            batch.push(Inbound::TradeTicks(ft));
        }
        for ev in batch {
            if in_tx.send(ev).await.is_err() {
                warn!("trader gone, mock feed stopping");
                return;
            }
        }
    }
}
