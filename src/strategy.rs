// ===============================
// src/strategy.rs
// ===============================
//
// AutoTrader: satu instance per sesi, semua callback diproses berurutan oleh
// satu task (tidak ada locking). Urutan per order book FUTURE:
//
// 1) spread estimate + quote pricer -> requote bid & ask (cancel/replace)
// 2) update Ichimoku dengan midprice
// 3) Buy (hanya kalau window leading span B sudah penuh) -> requote bid,
//    Sell -> requote ask (default tanpa gating, lihat SYMMETRIC_SIGNAL_GATING)
// 4) |position| >= unload threshold -> profit-taking: requote sisi lawan
//    kalau ada inventory yang sudah untung terhadap midprice
//
// Langkah 3 dan 4 memakai transisi yang sama dengan langkah 1, jadi hanya
// bertindak kalau harga target berbeda dari quote yang hidup.
//
use ahash::AHashMap as HashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::TraderParams;
use crate::domain::{Event, Inbound, Instruction, Instrument, OrderBook, Side, TraderSnapshot};
use crate::ichimoku::{IchimokuIndicator, IchimokuPeriods, Signal};
use crate::metrics::{BOOKS, EXECS, SIGNALS, SPREAD_ESTIMATE, STALE_BOOKS, TRADE_TICKS};
use crate::orders::OrderLifecycleManager;
use crate::pricing::compute_quotes;
use crate::spread::weighted_average_spread;

pub struct AutoTrader {
    params: TraderParams,
    indicator: IchimokuIndicator,
    orders: OrderLifecycleManager,
    // (instrument, is_trade_ticks) -> last sequence number seen
    last_seq: HashMap<(Instrument, bool), u64>,
    last_signal: Option<Signal>,
    books_seen: u64,
    connected: bool,
}

impl AutoTrader {
    pub fn new(params: TraderParams) -> Self {
        let indicator = IchimokuIndicator::new(IchimokuPeriods::from(&params));
        let orders = OrderLifecycleManager::new(&params);
        Self {
            params,
            indicator,
            orders,
            last_seq: HashMap::new(),
            last_signal: None,
            books_seen: 0,
            connected: true,
        }
    }

    pub fn indicator(&self) -> &IchimokuIndicator { &self.indicator }
    pub fn is_connected(&self) -> bool { self.connected }

    /// Dispatch one inbound event, returning the instructions it produced.
    pub fn handle(&mut self, ev: Inbound) -> Vec<Instruction> {
        let mut out = Vec::new();
        match ev {
            Inbound::OrderBook(book) => self.on_order_book(&book, &mut out),
            Inbound::TradeTicks(ticks) => self.on_trade_ticks(&ticks),
            Inbound::OrderFilled { order_id, price, volume } => self.orders.on_fill(order_id, price, volume, &mut out),
            Inbound::OrderStatus { order_id, fill_volume, remaining_volume, fees } => {
                self.orders.on_status(order_id, fill_volume, remaining_volume, fees)
            }
            Inbound::HedgeFilled { order_id, price, volume } => self.orders.on_hedge_filled(order_id, price, volume),
            Inbound::Error { order_id, message } => self.orders.on_error(order_id, &message),
            Inbound::Disconnect => self.on_disconnect(),
        }
        out
    }

    /// `false` if the update is older than (or equal to) the last one seen.
    /// The first update per stream is always accepted.
    fn accept_sequence(&mut self, instrument: Instrument, ticks: bool, seq: u64) -> bool {
        if let Some(&last) = self.last_seq.get(&(instrument, ticks)) {
            if seq <= last {
                STALE_BOOKS.with_label_values(&[instrument.as_str()]).inc();
                debug!(instrument = instrument.as_str(), seq, last, "stale update dropped");
                return false;
            }
        }
        self.last_seq.insert((instrument, ticks), seq);
        true
    }

    pub fn on_order_book(&mut self, book: &OrderBook, out: &mut Vec<Instruction>) {
        if !self.accept_sequence(book.instrument, false, book.sequence_number) {
            return;
        }
        BOOKS.with_label_values(&[book.instrument.as_str()]).inc();
        debug!(
            instrument = book.instrument.as_str(),
            seq = book.sequence_number,
            ask = book.ask_prices[0],
            ask_vol = book.ask_volumes[0],
            bid = book.bid_prices[0],
            bid_vol = book.bid_volumes[0],
            "order book"
        );
        if book.instrument != Instrument::Future {
            return;
        }
        self.books_seen += 1;

        let spread = weighted_average_spread(book);
        SPREAD_ESTIMATE.set(spread);
        let position = self.orders.position();
        let quotes = compute_quotes(book.best_bid(), book.best_ask(), position, spread, &self.params);

        self.orders.requote(Side::Sell, quotes.ask, out);
        self.orders.requote(Side::Buy, quotes.bid, out);

        // Tanpa dua sisi tidak ada midprice: indikator dan overlay dilewati.
        let Some(mid) = book.mid() else {
            return;
        };

        let signal = self.indicator.update(mid);
        SIGNALS.with_label_values(&[signal.as_str()]).inc();
        if let Some(l) = self.indicator.lines() {
            debug!(
                mid,
                conversion = l.conversion_line,
                baseline = l.baseline,
                span_a = l.leading_span_a,
                span_b = l.leading_span_b,
                lagging_ref = ?l.lagging_reference,
                signal = signal.as_str(),
                "ichimoku"
            );
        }
        self.last_signal = Some(signal);

        let warm = self.indicator.is_warm();
        match signal {
            Signal::Buy if warm => self.orders.requote(Side::Buy, quotes.bid, out),
            Signal::Sell if warm || !self.params.symmetric_signal_gating => {
                self.orders.requote(Side::Sell, quotes.ask, out)
            }
            _ => {}
        }

        let position = self.orders.position();
        if position.abs() >= self.params.unload_threshold {
            if self.orders.book().has_profitable_long(mid) {
                self.orders.requote(Side::Sell, quotes.ask, out);
            }
            if self.orders.book().has_profitable_short(mid) {
                self.orders.requote(Side::Buy, quotes.bid, out);
            }
        }
    }

    pub fn on_trade_ticks(&mut self, ticks: &OrderBook) {
        if !self.accept_sequence(ticks.instrument, true, ticks.sequence_number) {
            return;
        }
        TRADE_TICKS.with_label_values(&[ticks.instrument.as_str()]).inc();
        debug!(
            instrument = ticks.instrument.as_str(),
            seq = ticks.sequence_number,
            ask = ticks.ask_prices[0],
            ask_vol = ticks.ask_volumes[0],
            bid = ticks.bid_prices[0],
            bid_vol = ticks.bid_volumes[0],
            "trade ticks"
        );
    }

    fn on_disconnect(&mut self) {
        EXECS.with_label_values(&["disconnect"]).inc();
        self.connected = false;
        warn!("execution connection lost");
    }

    pub fn snapshot(&self) -> TraderSnapshot {
        TraderSnapshot {
            position: self.orders.position(),
            hedges: self.orders.hedges(),
            ask_ids: self.orders.live_ids(Side::Sell),
            bid_ids: self.orders.live_ids(Side::Buy),
            last_signal: self.last_signal.map(|s| s.as_str().to_string()),
            books_seen: self.books_seen,
        }
    }
}

/// Trader task: consumes inbound events in order, forwards instructions to the
/// gateway, records both directions and publishes a snapshot after each event.
pub async fn run(
    mut in_rx: mpsc::Receiver<Inbound>,
    out_tx: mpsc::UnboundedSender<Instruction>,
    rec_tx: mpsc::Sender<Event>,
    snap_tx: watch::Sender<TraderSnapshot>,
    params: TraderParams,
) {
    let mut trader = AutoTrader::new(params);
    info!("trader started");

    while let Some(ev) = in_rx.recv().await {
        let _ = rec_tx.try_send(Event::In(ev.clone()));
        for ins in trader.handle(ev) {
            let _ = rec_tx.try_send(Event::Out(ins.clone()));
            if let Err(e) = out_tx.send(ins) {
                warn!(?e, "gateway channel closed, instruction dropped");
            }
        }
        let _ = snap_tx.send(trader.snapshot());

        if !trader.is_connected() {
            let _ = rec_tx.try_send(Event::Note("execution connection lost".into()));
            break;
        }
    }
    info!("trader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lifespan;

    fn book(instrument: Instrument, seq: u64, bid: i64, ask: i64) -> OrderBook {
        OrderBook {
            instrument,
            sequence_number: seq,
            ask_prices: [ask, ask + 100, 0, 0, 0],
            ask_volumes: [30, 10, 0, 0, 0],
            bid_prices: [bid, bid - 100, 0, 0, 0],
            bid_volumes: [50, 10, 0, 0, 0],
        }
    }

    fn inserts(out: &[Instruction]) -> Vec<(Side, i64, i64)> {
        out.iter()
            .filter_map(|i| match i {
                Instruction::Insert { side, price, volume, lifespan: Lifespan::GoodForDay, .. } => Some((*side, *price, *volume)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn first_future_book_quotes_both_sides() {
        let mut t = AutoTrader::new(TraderParams::default());
        let out = t.handle(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100)));
        // spread: level0 half 100 (vol 30), level1 half 200 (vol 10) -> 5000/40 = 125
        assert_eq!(inserts(&out), vec![(Side::Sell, 10_200, 100), (Side::Buy, 9_700, 100)]);
    }

    #[test]
    fn etf_book_does_not_quote() {
        let mut t = AutoTrader::new(TraderParams::default());
        let out = t.handle(Inbound::OrderBook(book(Instrument::Etf, 1, 9_900, 10_100)));
        assert!(out.is_empty());
        assert_eq!(t.indicator().samples(), 0);
    }

    #[test]
    fn stale_book_is_dropped() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 5, 9_900, 10_100)));
        let out = t.handle(Inbound::OrderBook(book(Instrument::Future, 4, 9_500, 9_700)));
        assert!(out.is_empty());
        assert_eq!(t.indicator().samples(), 1);
    }

    #[test]
    fn sequence_zero_does_not_rearm_older_books() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 5, 9_900, 10_100)));
        assert!(t.handle(Inbound::OrderBook(book(Instrument::Future, 0, 9_500, 9_700))).is_empty());
        assert!(t.handle(Inbound::OrderBook(book(Instrument::Future, 3, 9_500, 9_700))).is_empty());
        assert_eq!(t.indicator().samples(), 1);
        // other streams keep their own counter
        t.handle(Inbound::OrderBook(book(Instrument::Etf, 0, 9_900, 10_100)));
        t.handle(Inbound::TradeTicks(book(Instrument::Future, 1, 9_900, 10_100)));
        assert_eq!(t.snapshot().books_seen, 1);
    }

    #[test]
    fn moved_market_cancels_and_replaces() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100)));
        let out = t.handle(Inbound::OrderBook(book(Instrument::Future, 2, 10_400, 10_600)));
        let cancels: Vec<_> = out.iter().filter(|i| matches!(i, Instruction::Cancel { .. })).collect();
        assert_eq!(cancels.len(), 2);
        assert_eq!(inserts(&out).len(), 2);
        assert_eq!(t.snapshot().ask_ids.len(), 2);
    }

    #[test]
    fn one_sided_book_skips_indicator() {
        let mut t = AutoTrader::new(TraderParams::default());
        let mut b = book(Instrument::Future, 1, 9_900, 10_100);
        b.bid_prices = [0; 5];
        let out = t.handle(Inbound::OrderBook(b));
        assert_eq!(inserts(&out), vec![(Side::Sell, 10_100, 100)]);
        assert_eq!(t.indicator().samples(), 0);
    }

    #[test]
    fn full_long_position_stops_bidding() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100)));
        // bid is order 2
        t.handle(Inbound::OrderFilled { order_id: 2, price: 9_700, volume: 100 });
        t.handle(Inbound::OrderStatus { order_id: 2, fill_volume: 100, remaining_volume: 0, fees: 0 });
        assert_eq!(t.snapshot().position, 100);

        let out = t.handle(Inbound::OrderBook(book(Instrument::Future, 2, 9_800, 10_000)));
        assert!(inserts(&out).iter().all(|(side, _, _)| *side == Side::Sell));
    }

    #[test]
    fn error_on_ask_clears_it() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100)));
        t.handle(Inbound::Error { order_id: 1, message: "invalid price".into() });
        let snap = t.snapshot();
        assert!(snap.ask_ids.is_empty());
        assert_eq!(snap.bid_ids, vec![2]);
    }

    #[test]
    fn fill_produces_hedge() {
        let mut t = AutoTrader::new(TraderParams::default());
        t.handle(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100)));
        let out = t.handle(Inbound::OrderFilled { order_id: 1, price: 10_200, volume: 20 });
        assert_eq!(out, vec![Instruction::Hedge { order_id: 3, side: Side::Buy, price: 2_147_483_600, volume: 20 }]);
        t.handle(Inbound::HedgeFilled { order_id: 3, price: 10_150, volume: 20 });
        let snap = t.snapshot();
        assert_eq!((snap.position, snap.hedges), (-20, 20));
    }

    #[test]
    fn disconnect_marks_trader_offline() {
        let mut t = AutoTrader::new(TraderParams::default());
        assert!(t.handle(Inbound::Disconnect).is_empty());
        assert!(!t.is_connected());
    }

    #[test]
    fn signals_are_counted_after_warm_up() {
        let p = TraderParams { conversion_period: 2, baseline_period: 3, leading_span_b_period: 4, ..Default::default() };
        let mut t = AutoTrader::new(p);
        for i in 0..10 {
            let bid = 9_900 + i * 100;
            t.handle(Inbound::OrderBook(book(Instrument::Future, i as u64 + 1, bid, bid + 200)));
        }
        assert!(t.indicator().is_warm());
        assert_eq!(t.snapshot().last_signal.as_deref(), Some("buy"));
    }

    #[tokio::test]
    async fn task_forwards_instructions_and_stops_on_disconnect() {
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::unbounded_channel();
        let (rec_tx, mut rec_rx) = mpsc::channel(64);
        let (snap_tx, snap_rx) = watch::channel(TraderSnapshot::default());

        let handle = tokio::spawn(run(in_rx, out_tx, rec_tx, snap_tx, TraderParams::default()));
        in_tx.send(Inbound::OrderBook(book(Instrument::Future, 1, 9_900, 10_100))).await.unwrap();
        in_tx.send(Inbound::Disconnect).await.unwrap();
        handle.await.unwrap();

        let mut sent = Vec::new();
        while let Ok(ins) = out_rx.try_recv() {
            sent.push(ins);
        }
        assert_eq!(inserts(&sent).len(), 2);
        assert_eq!(snap_rx.borrow().books_seen, 1);

        let mut recorded = 0;
        while rec_rx.try_recv().is_ok() {
            recorded += 1;
        }
        // 2 inbound + 2 outbound + note
        assert_eq!(recorded, 5);
    }
}
