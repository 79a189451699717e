// ===============================
// src/positions.rs (position, hedges & inventory)
// ===============================
//
// Catatan: kalau fill ditolak oleh risk check, inventory & lot size tetap
// dicatat tapi `position` tidak berubah. Jadi `position` bisa lebih kecil dari
// total inventory yang tercatat. Ini aproksimasi yang diketahui, bukan bug.
//
use ahash::AHashMap as HashMap;
use tracing::warn;

use crate::domain::Side;
use crate::metrics::{FILLS_OVER_LIMIT, HEDGES, POSITION};
use crate::risk::{check_exposure, RiskError};

/// Cost basis of one FUTURE order. Fees can accrue before the first fill
/// arrives, so the price stays unset until then.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CostBasis { pub price: Option<i64>, pub fees: i64 }

impl CostBasis {
    /// Fill price plus accrued fees, `None` while unfilled.
    pub fn cost(&self) -> Option<i64> { self.price.map(|p| p + self.fees) }
}

#[derive(Debug, Default)]
pub struct PositionBook {
    position: i64,
    hedges: i64,
    // order id -> cost basis (fill price + fees)
    long_inventory: HashMap<u64, CostBasis>,
    short_inventory: HashMap<u64, CostBasis>,
    // order id -> lots
    lot_sizes: HashMap<u64, i64>,
}

impl PositionBook {
    pub fn new() -> Self { Self::default() }

    pub fn position(&self) -> i64 { self.position }
    pub fn hedges(&self) -> i64 { self.hedges }
    pub fn long_cost(&self, order_id: u64) -> Option<i64> { self.long_inventory.get(&order_id).and_then(CostBasis::cost) }
    pub fn short_cost(&self, order_id: u64) -> Option<i64> { self.short_inventory.get(&order_id).and_then(CostBasis::cost) }
    pub fn lot_size(&self, order_id: u64) -> Option<i64> { self.lot_sizes.get(&order_id).copied() }

    /// Record a FUTURE fill. Inventory is always recorded (first price wins for
    /// repeated partial fills, fees accrued earlier are kept); the position
    /// moves only if the risk check passes.
    pub fn apply_fill(&mut self, order_id: u64, side: Side, price: i64, volume: i64, limit: i64) -> Result<i64, RiskError> {
        let inventory = match side {
            Side::Buy => &mut self.long_inventory,
            Side::Sell => &mut self.short_inventory,
        };
        inventory.entry(order_id).or_default().price.get_or_insert(price);
        self.lot_sizes.entry(order_id).or_insert(volume);

        let new_position = self.position + side.sign() * volume;
        if let Err(e) = check_exposure(new_position, self.hedges, limit) {
            FILLS_OVER_LIMIT.inc();
            warn!(order_id, %e, position = self.position, "fill not applied to position");
            return Err(e);
        }
        self.position = new_position;
        POSITION.set(self.position);
        Ok(self.position)
    }

    /// Partial status update: fees accrue into both inventory maps.
    pub fn accrue_fees(&mut self, order_id: u64, fees: i64, remaining_volume: i64) {
        self.long_inventory.entry(order_id).or_default().fees += fees;
        self.short_inventory.entry(order_id).or_default().fees -= fees;
        self.lot_sizes.insert(order_id, remaining_volume);
    }

    pub fn apply_hedge_fill(&mut self, side: Side, volume: i64) -> i64 {
        self.hedges += side.sign() * volume;
        HEDGES.set(self.hedges);
        self.hedges
    }

    /// Long lots bought below `mid`, eligible to be sold for a profit.
    /// Fee-only entries (no fill yet) never count.
    pub fn has_profitable_long(&self, mid: i64) -> bool {
        self.long_inventory.values().filter_map(CostBasis::cost).any(|cost| cost < mid)
    }

    /// Short lots sold above `mid`, eligible to be bought back for a profit.
    pub fn has_profitable_short(&self, mid: i64) -> bool {
        self.short_inventory.values().filter_map(CostBasis::cost).any(|cost| cost > mid)
    }
}
