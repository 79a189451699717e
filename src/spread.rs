// ===============================
// src/spread.rs
// ===============================
use crate::domain::OrderBook;

/// Volume-weighted average half-spread over the levels where both sides quote.
///
/// Each level contributes `(ask - bid) / 2` weighted by `min(ask_vol, bid_vol)`.
/// Returns 0 when no level qualifies (or all qualifying levels carry no volume).
pub fn weighted_average_spread(book: &OrderBook) -> i64 {
    let mut total_volume = 0_i64;
    let mut weighted = 0_i64;

    for i in 0..book.ask_prices.len() {
        let (ask, bid) = (book.ask_prices[i], book.bid_prices[i]);
        if ask == 0 || bid == 0 {
            continue;
        }
        let half_spread = (ask - bid) / 2;
        let volume = book.ask_volumes[i].min(book.bid_volumes[i]);
        total_volume += volume;
        weighted += half_spread * volume;
    }

    if total_volume > 0 { weighted / total_volume } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Instrument;

    fn book(asks: [(i64, i64); 5], bids: [(i64, i64); 5]) -> OrderBook {
        OrderBook {
            instrument: Instrument::Future,
            sequence_number: 1,
            ask_prices: asks.map(|l| l.0),
            ask_volumes: asks.map(|l| l.1),
            bid_prices: bids.map(|l| l.0),
            bid_volumes: bids.map(|l| l.1),
        }
    }

    #[test]
    fn single_level_half_spread() {
        let b = book(
            [(1002, 30), (0, 0), (0, 0), (0, 0), (0, 0)],
            [(998, 50), (0, 0), (0, 0), (0, 0), (0, 0)],
        );
        assert_eq!(weighted_average_spread(&b), 2);
    }

    #[test]
    fn weights_by_thinner_side() {
        // level0: half 100 * 10, level1: half 300 * 30 -> 10000/40 = 250
        let b = book(
            [(10_100, 10), (10_300, 30), (0, 0), (0, 0), (0, 0)],
            [(9_900, 20), (9_700, 40), (0, 0), (0, 0), (0, 0)],
        );
        assert_eq!(weighted_average_spread(&b), 250);
    }

    #[test]
    fn one_sided_levels_are_skipped() {
        let b = book(
            [(10_100, 10), (10_200, 99), (0, 0), (0, 0), (0, 0)],
            [(9_900, 10), (0, 0), (0, 0), (0, 0), (0, 0)],
        );
        assert_eq!(weighted_average_spread(&b), 100);
    }

    #[test]
    fn empty_book_is_zero() {
        let b = book([(0, 0); 5], [(0, 0); 5]);
        assert_eq!(weighted_average_spread(&b), 0);
    }

    #[test]
    fn zero_volume_levels_do_not_divide_by_zero() {
        let b = book(
            [(10_100, 0), (0, 0), (0, 0), (0, 0), (0, 0)],
            [(9_900, 5), (0, 0), (0, 0), (0, 0), (0, 0)],
        );
        assert_eq!(weighted_average_spread(&b), 0);
    }
}
