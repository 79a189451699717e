// ===============================
// src/gateway.rs (mock exchange)
// ===============================
//
// Simulator sederhana untuk order gateway:
// - Insert  -> status ack (remaining = volume), order resting
// - tiap `fill_ms`: order resting terisi penuh dengan peluang `fill_probability`
//   -> OrderFilled lalu OrderStatus(remaining 0)
// - Cancel  -> OrderStatus(remaining 0), atau Error kalau id tidak resting
// - Hedge   -> HedgeFilled di touch ETF terakhir (0/0 kalau belum ada harga)
// - channel instruksi tertutup -> Disconnect
//
use ahash::AHashMap as HashMap;
use rand::Rng;
use tokio::{
    sync::{mpsc, watch},
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::domain::{Inbound, Instruction, Side};
use crate::feed::EtfTouch;

#[derive(Debug, Clone)]
pub struct GatewayCfg { pub fill_ms: u64, pub fill_probability: f64, pub fee_per_lot: i64 }

#[derive(Debug, Clone, Copy)]
struct Resting { price: i64, volume: i64 }

/// Exchange-side state, kept separate from the task so it can be driven in tests.
#[derive(Debug, Default)]
pub struct MockExchange {
    resting: HashMap<u64, Resting>,
    fee_per_lot: i64,
}

impl MockExchange {
    pub fn new(fee_per_lot: i64) -> Self { Self { resting: HashMap::new(), fee_per_lot } }

    #[cfg(test)]
    pub fn resting_count(&self) -> usize { self.resting.len() }

    pub fn apply(&mut self, ins: Instruction, etf: EtfTouch) -> Vec<Inbound> {
        match ins {
            Instruction::Insert { order_id, price, volume, .. } => {
                self.resting.insert(order_id, Resting { price, volume });
                vec![Inbound::OrderStatus { order_id, fill_volume: 0, remaining_volume: volume, fees: 0 }]
            }
            Instruction::Cancel { order_id } => match self.resting.remove(&order_id) {
                Some(_) => vec![Inbound::OrderStatus { order_id, fill_volume: 0, remaining_volume: 0, fees: 0 }],
                None => vec![Inbound::Error { order_id, message: "out-of-date order id".into() }],
            },
            Instruction::Hedge { order_id, side, price, volume } => {
                let (etf_bid, etf_ask) = etf;
                let fill_px = match side {
                    Side::Buy if etf_ask > 0 && etf_ask <= price => etf_ask,
                    Side::Sell if etf_bid > 0 && etf_bid >= price => etf_bid,
                    _ => 0,
                };
                let filled = if fill_px > 0 { volume } else { 0 };
                vec![Inbound::HedgeFilled { order_id, price: fill_px, volume: filled }]
            }
        }
    }

    /// Fill every resting order with probability `p`.
    pub fn match_resting<R: Rng>(&mut self, rng: &mut R, p: f64) -> Vec<Inbound> {
        let mut hit: Vec<u64> = self.resting.keys().copied().filter(|_| rng.gen_bool(p.clamp(0.0, 1.0))).collect();
        hit.sort_unstable();
        let mut out = Vec::with_capacity(hit.len() * 2);
        for order_id in hit {
            if let Some(r) = self.resting.remove(&order_id) {
                out.push(Inbound::OrderFilled { order_id, price: r.price, volume: r.volume });
                out.push(Inbound::OrderStatus {
                    order_id,
                    fill_volume: r.volume,
                    remaining_volume: 0,
                    fees: r.volume * self.fee_per_lot,
                });
            }
        }
        out
    }
}

pub async fn run_mock(
    mut rx: mpsc::UnboundedReceiver<Instruction>,
    in_tx: mpsc::Sender<Inbound>,
    etf_rx: watch::Receiver<EtfTouch>,
    cfg: GatewayCfg,
) {
    let mut exchange = MockExchange::new(cfg.fee_per_lot);
    let mut tick = interval(Duration::from_millis(cfg.fill_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(fill_ms = cfg.fill_ms, p = cfg.fill_probability, "mock gateway started");

    loop {
        let replies = tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(ins) => {
                    debug!(?ins, "gateway received");
                    let etf = *etf_rx.borrow();
                    exchange.apply(ins, etf)
                }
                None => {
                    let _ = in_tx.send(Inbound::Disconnect).await;
                    info!("instruction channel closed, mock gateway stopped");
                    return;
                }
            },
            _ = tick.tick() => {
                let mut rng = rand::thread_rng();
                exchange.match_resting(&mut rng, cfg.fill_probability)
            }
        };
        for ev in replies {
            if in_tx.send(ev).await.is_err() {
                info!("trader gone, mock gateway stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Lifespan;
    use rand::{rngs::StdRng, SeedableRng};

    fn insert(order_id: u64, volume: i64) -> Instruction {
        Instruction::Insert { order_id, side: Side::Buy, price: 9_800, volume, lifespan: Lifespan::GoodForDay }
    }

    #[test]
    fn insert_acks_with_full_remaining() {
        let mut ex = MockExchange::new(0);
        let r = ex.apply(insert(1, 40), (0, 0));
        assert!(matches!(r[0], Inbound::OrderStatus { order_id: 1, remaining_volume: 40, .. }));
        assert_eq!(ex.resting_count(), 1);
    }

    #[test]
    fn cancel_unknown_id_errors() {
        let mut ex = MockExchange::new(0);
        let r = ex.apply(Instruction::Cancel { order_id: 9 }, (0, 0));
        assert!(matches!(r[0], Inbound::Error { order_id: 9, .. }));
    }

    #[test]
    fn cancel_resting_closes_it() {
        let mut ex = MockExchange::new(0);
        ex.apply(insert(1, 40), (0, 0));
        let r = ex.apply(Instruction::Cancel { order_id: 1 }, (0, 0));
        assert!(matches!(r[0], Inbound::OrderStatus { order_id: 1, remaining_volume: 0, .. }));
        assert_eq!(ex.resting_count(), 0);
    }

    #[test]
    fn hedge_fills_at_etf_touch() {
        let mut ex = MockExchange::new(0);
        let r = ex.apply(Instruction::Hedge { order_id: 3, side: Side::Buy, price: 2_147_483_600, volume: 7 }, (9_900, 10_000));
        assert!(matches!(r[0], Inbound::HedgeFilled { order_id: 3, price: 10_000, volume: 7 }));
        let r = ex.apply(Instruction::Hedge { order_id: 4, side: Side::Sell, price: 100, volume: 7 }, (0, 0));
        assert!(matches!(r[0], Inbound::HedgeFilled { order_id: 4, price: 0, volume: 0 }));
    }

    #[test]
    fn certain_match_fills_then_closes() {
        let mut ex = MockExchange::new(1);
        ex.apply(insert(1, 40), (0, 0));
        let mut rng = StdRng::seed_from_u64(3);
        let r = ex.match_resting(&mut rng, 1.0);
        assert!(matches!(r[0], Inbound::OrderFilled { order_id: 1, price: 9_800, volume: 40 }));
        assert!(matches!(r[1], Inbound::OrderStatus { order_id: 1, remaining_volume: 0, fees: 40, .. }));
        assert_eq!(ex.resting_count(), 0);
    }
}
