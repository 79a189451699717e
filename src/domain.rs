// ===============================
// src/domain.rs
// ===============================
use serde::{Deserialize, Serialize};

/// Depth of every order book / trade tick snapshot.
pub const TOP_LEVEL_COUNT: usize = 5;

pub type PriceVolumeArray = [i64; TOP_LEVEL_COUNT];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side { Buy, Sell }
impl Side {
    pub fn sign(&self) -> i64 { match self { Side::Buy => 1, Side::Sell => -1 } }
    pub fn opposite(&self) -> Side { match self { Side::Buy => Side::Sell, Side::Sell => Side::Buy } }
    pub fn as_str(&self) -> &'static str { match self { Side::Buy => "buy", Side::Sell => "sell" } }
}

/// FUTURE is the quoted instrument, ETF is the correlated hedge leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument { Future, Etf }
impl Instrument {
    pub fn as_str(&self) -> &'static str { match self { Instrument::Future => "future", Instrument::Etf => "etf" } }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifespan { GoodForDay }

/// Top-of-book snapshot, best-to-worst. A zero price/volume marks an absent level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBook {
    pub instrument: Instrument,
    pub sequence_number: u64,
    pub ask_prices: PriceVolumeArray,
    pub ask_volumes: PriceVolumeArray,
    pub bid_prices: PriceVolumeArray,
    pub bid_volumes: PriceVolumeArray,
}

impl OrderBook {
    pub fn best_bid(&self) -> i64 { self.bid_prices[0] }
    pub fn best_ask(&self) -> i64 { self.ask_prices[0] }

    /// Midprice of the touch, `None` while either side is empty.
    pub fn mid(&self) -> Option<i64> {
        if self.best_bid() != 0 && self.best_ask() != 0 {
            Some((self.best_bid() + self.best_ask()) / 2)
        } else {
            None
        }
    }
}

/// Everything the market-data / execution collaborator pushes at the trader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Inbound {
    OrderBook(OrderBook),
    TradeTicks(OrderBook),
    OrderFilled { order_id: u64, price: i64, volume: i64 },
    OrderStatus { order_id: u64, fill_volume: i64, remaining_volume: i64, fees: i64 },
    HedgeFilled { order_id: u64, price: i64, volume: i64 },
    Error { order_id: u64, message: String },
    Disconnect,
}

/// Instructions sent to the order gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    Insert { order_id: u64, side: Side, price: i64, volume: i64, lifespan: Lifespan },
    Cancel { order_id: u64 },
    Hedge { order_id: u64, side: Side, price: i64, volume: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event { In(Inbound), Out(Instruction), Note(String) }

/// What the trader task publishes after each handled event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraderSnapshot {
    pub position: i64,
    pub hedges: i64,
    pub ask_ids: Vec<u64>,
    pub bid_ids: Vec<u64>,
    pub last_signal: Option<String>,
    pub books_seen: u64,
}
