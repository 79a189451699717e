// ===============================
// src/pricing.rs
// ===============================
//
// Quote pricer: touch FUTURE + inventory skew +/- spread estimate, dibulatkan
// ke bawah ke tick, size dibatasi sisa kapasitas posisi.
//
use serde::{Deserialize, Serialize};

use crate::config::TraderParams;

/// A price of 0 means "no quote on this side"; a volume of 0 suppresses it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote { pub price: i64, pub volume: i64 }

impl Quote {
    pub fn is_quotable(&self) -> bool { self.price > 0 && self.volume > 0 }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuotePair { pub bid: Quote, pub ask: Quote }

pub fn round_down_to_tick(price: i64, tick: i64) -> i64 {
    if price <= 0 { 0 } else { price / tick * tick }
}

/// Skew in price units: a long position pushes both quotes down, a short one up.
pub fn price_adjustment(position: i64, p: &TraderParams) -> i64 {
    -(position / p.lot_size) * p.tick_size
}

/// Remaining capacity clamped to [0, lot_size].
pub fn ask_size(position: i64, p: &TraderParams) -> i64 {
    p.lot_size.min(p.position_limit + position).max(0)
}

pub fn bid_size(position: i64, p: &TraderParams) -> i64 {
    p.lot_size.min(p.position_limit - position).max(0)
}

pub fn compute_quotes(best_bid: i64, best_ask: i64, position: i64, spread: i64, p: &TraderParams) -> QuotePair {
    let adj = price_adjustment(position, p);

    let ask_price = if best_ask != 0 { round_down_to_tick(best_ask + adj + spread, p.tick_size) } else { 0 };
    let bid_price = if best_bid != 0 { round_down_to_tick(best_bid + adj - spread, p.tick_size) } else { 0 };

    QuotePair {
        bid: Quote { price: bid_price, volume: bid_size(position, p) },
        ask: Quote { price: ask_price, volume: ask_size(position, p) },
    }
}
