// ===============================
// src/orders.rs (order lifecycle)
// ===============================
//
// Satu slot quote per sisi (bid/ask) di FUTURE:
//
//   Idle ──insert──▶ Active{id, price}
//   Active ──harga target berubah──▶ cancel(id) + insert(baru)
//          ──▶ PendingCancel{cancelling: id, replacement: Some(baru)}
//   PendingCancel ──status remaining=0 untuk `cancelling`──▶ Active(replacement) / Idle
//
// Cancel+replace sengaja tidak menunggu ack cancel: selama PendingCancel boleh
// ada dua order hidup di satu sisi (yang sedang di-cancel + penggantinya).
// Perubahan harga berikutnya di sisi itu ditahan sampai cancel selesai, jadi
// maksimal dua. Pengaman eksposur adalah size yang di-clamp ke limit posisi
// dan risk check di fill, bukan serialisasi order.
//
use ahash::{AHashMap as HashMap, AHashSet as HashSet};
use tracing::{debug, info, warn};

use crate::config::TraderParams;
use crate::domain::{Instruction, Lifespan, Side};
use crate::metrics::{EXECS, INSTRUCTIONS, LIVE_ORDERS};
use crate::positions::PositionBook;
use crate::pricing::Quote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveQuote { pub order_id: u64, pub price: i64, pub volume: i64 }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    #[default]
    Idle,
    Active(LiveQuote),
    /// `replacement` set = transient dual-order state.
    PendingCancel { cancelling: u64, replacement: Option<LiveQuote> },
}

impl SlotState {
    pub fn is_pending_cancel(&self) -> bool { matches!(self, SlotState::PendingCancel { .. }) }

    fn on_terminal(self, order_id: u64) -> SlotState {
        match self {
            SlotState::Active(q) if q.order_id == order_id => SlotState::Idle,
            SlotState::PendingCancel { cancelling, replacement } if cancelling == order_id => {
                replacement.map(SlotState::Active).unwrap_or(SlotState::Idle)
            }
            SlotState::PendingCancel { cancelling, replacement: Some(r) } if r.order_id == order_id => {
                SlotState::PendingCancel { cancelling, replacement: None }
            }
            other => other,
        }
    }
}

pub struct OrderLifecycleManager {
    next_id: u64,
    position_limit: i64,
    hedge_bid_price: i64,
    hedge_ask_price: i64,

    ask: SlotState,
    bid: SlotState,
    // every live FUTURE order, including ones being cancelled
    asks: HashSet<u64>,
    bids: HashSet<u64>,
    // side of every FUTURE order issued this session (fills may trail the status)
    sides: HashMap<u64, Side>,
    hedge_sides: HashMap<u64, Side>,
    // reached remaining volume 0
    closed: HashSet<u64>,

    book: PositionBook,
}

impl OrderLifecycleManager {
    pub fn new(p: &TraderParams) -> Self {
        Self {
            next_id: 1,
            position_limit: p.position_limit,
            hedge_bid_price: p.min_bid_nearest_tick(),
            hedge_ask_price: p.max_ask_nearest_tick(),
            ask: SlotState::Idle,
            bid: SlotState::Idle,
            asks: HashSet::new(),
            bids: HashSet::new(),
            sides: HashMap::new(),
            hedge_sides: HashMap::new(),
            closed: HashSet::new(),
            book: PositionBook::new(),
        }
    }

    pub fn position(&self) -> i64 { self.book.position() }
    pub fn hedges(&self) -> i64 { self.book.hedges() }
    pub fn book(&self) -> &PositionBook { &self.book }

    pub fn slot(&self, side: Side) -> SlotState {
        match side { Side::Buy => self.bid, Side::Sell => self.ask }
    }

    pub fn live_ids(&self, side: Side) -> Vec<u64> {
        let set = match side { Side::Buy => &self.bids, Side::Sell => &self.asks };
        let mut ids: Vec<u64> = set.iter().copied().collect();
        ids.sort_unstable();
        ids
    }

    fn set_slot(&mut self, side: Side, state: SlotState) {
        match side { Side::Buy => self.bid = state, Side::Sell => self.ask = state }
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn insert(&mut self, side: Side, target: Quote, out: &mut Vec<Instruction>) -> LiveQuote {
        let order_id = self.allocate_id();
        self.sides.insert(order_id, side);
        match side { Side::Buy => self.bids.insert(order_id), Side::Sell => self.asks.insert(order_id) };
        LIVE_ORDERS.with_label_values(&[side.as_str()]).set(self.live_count(side));
        INSTRUCTIONS.with_label_values(&["insert"]).inc();
        info!(order_id, side = side.as_str(), price = target.price, volume = target.volume, "insert");
        out.push(Instruction::Insert {
            order_id,
            side,
            price: target.price,
            volume: target.volume,
            lifespan: Lifespan::GoodForDay,
        });
        LiveQuote { order_id, price: target.price, volume: target.volume }
    }

    fn cancel(&self, order_id: u64, out: &mut Vec<Instruction>) {
        INSTRUCTIONS.with_label_values(&["cancel"]).inc();
        info!(order_id, "cancel");
        out.push(Instruction::Cancel { order_id });
    }

    fn live_count(&self, side: Side) -> i64 {
        match side { Side::Buy => self.bids.len() as i64, Side::Sell => self.asks.len() as i64 }
    }

    /// Move the quote on `side` to `target` if its price changed.
    ///
    /// A zero target price leaves the side untouched. A zero volume still
    /// cancels a stale order but places nothing new.
    pub fn requote(&mut self, side: Side, target: Quote, out: &mut Vec<Instruction>) {
        if target.price <= 0 {
            return;
        }
        match self.slot(side) {
            SlotState::Idle => {
                if target.volume > 0 {
                    let q = self.insert(side, target, out);
                    self.set_slot(side, SlotState::Active(q));
                }
            }
            SlotState::Active(live) if live.price != target.price => {
                self.cancel(live.order_id, out);
                let replacement = if target.volume > 0 { Some(self.insert(side, target, out)) } else { None };
                self.set_slot(side, SlotState::PendingCancel { cancelling: live.order_id, replacement });
            }
            SlotState::Active(_) => {}
            SlotState::PendingCancel { cancelling, .. } => {
                debug!(side = side.as_str(), cancelling, "cancel in flight, requote suppressed");
            }
        }
    }

    /// FUTURE fill. Always hedges on the ETF at the extreme tick-aligned price,
    /// whether or not the position accepted the fill.
    pub fn on_fill(&mut self, order_id: u64, price: i64, volume: i64, out: &mut Vec<Instruction>) {
        EXECS.with_label_values(&["fill"]).inc();
        let Some(side) = self.sides.get(&order_id).copied() else {
            warn!(order_id, price, volume, "fill for unknown order ignored");
            return;
        };
        if volume <= 0 {
            debug!(order_id, "empty fill");
            return;
        }

        info!(order_id, side = side.as_str(), price, volume, "filled");
        if let Err(e) = self.book.apply_fill(order_id, side, price, volume, self.position_limit) {
            debug!(order_id, %e, "fill refused by risk check, hedging anyway");
        }

        let hedge_side = side.opposite();
        let hedge_price = match hedge_side { Side::Buy => self.hedge_ask_price, Side::Sell => self.hedge_bid_price };
        let hedge_id = self.allocate_id();
        self.hedge_sides.insert(hedge_id, hedge_side);
        INSTRUCTIONS.with_label_values(&["hedge"]).inc();
        info!(hedge_id, side = hedge_side.as_str(), price = hedge_price, volume, "hedge");
        out.push(Instruction::Hedge { order_id: hedge_id, side: hedge_side, price: hedge_price, volume });
    }

    /// Status update. Remaining 0 is terminal; ids already terminal or never
    /// issued are ignored.
    pub fn on_status(&mut self, order_id: u64, fill_volume: i64, remaining_volume: i64, fees: i64) {
        EXECS.with_label_values(&["status"]).inc();
        if self.closed.contains(&order_id) || !self.sides.contains_key(&order_id) {
            debug!(order_id, remaining_volume, "status for inactive order ignored");
            return;
        }

        if remaining_volume == 0 {
            self.ask = self.ask.on_terminal(order_id);
            self.bid = self.bid.on_terminal(order_id);
            self.asks.remove(&order_id);
            self.bids.remove(&order_id);
            self.closed.insert(order_id);
            LIVE_ORDERS.with_label_values(&["sell"]).set(self.asks.len() as i64);
            LIVE_ORDERS.with_label_values(&["buy"]).set(self.bids.len() as i64);
            info!(order_id, fill_volume, fees, "order closed");
        } else {
            self.book.accrue_fees(order_id, fees, remaining_volume);
            debug!(order_id, fill_volume, remaining_volume, fees, "order status");
        }
    }

    /// Order-specific errors on a live order force a terminal status.
    pub fn on_error(&mut self, order_id: u64, message: &str) {
        EXECS.with_label_values(&["error"]).inc();
        warn!(order_id, %message, "error from exchange");
        if order_id != 0 && (self.asks.contains(&order_id) || self.bids.contains(&order_id)) {
            self.on_status(order_id, 0, 0, 0);
        }
    }

    pub fn on_hedge_filled(&mut self, order_id: u64, price: i64, volume: i64) {
        EXECS.with_label_values(&["hedge_fill"]).inc();
        let Some(side) = self.hedge_sides.get(&order_id).copied() else {
            warn!(order_id, "hedge fill for unknown hedge ignored");
            return;
        };
        if price == 0 || volume == 0 {
            warn!(order_id, "hedge order unsuccessful");
            return;
        }
        let hedges = self.book.apply_hedge_fill(side, volume);
        info!(order_id, side = side.as_str(), price, volume, hedges, "hedge filled");
    }
}
