// ===============================
// src/ichimoku.rs
// ===============================
//
// Ichimoku versi streaming, dihitung dari midprice FUTURE di setiap order book.
//
// Beda dengan definisi buku teks (yang pakai high/low):
// - baseline merata-ratakan conversion line (bukan harga mentah),
// - leading span B = (SUM window + baseline) / 2, bukan rata-rata.
// Keduanya dipertahankan apa adanya karena threshold cloud bergantung padanya.
//
use serde::{Deserialize, Serialize};

use crate::config::TraderParams;
use crate::window::SlidingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal { Buy, Sell, Neutral }
impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self { Signal::Buy => "buy", Signal::Sell => "sell", Signal::Neutral => "neutral" }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IchimokuPeriods { pub conversion: usize, pub baseline: usize, pub leading_span_b: usize }

impl From<&TraderParams> for IchimokuPeriods {
    fn from(p: &TraderParams) -> Self {
        Self { conversion: p.conversion_period, baseline: p.baseline_period, leading_span_b: p.leading_span_b_period }
    }
}

/// Line values computed from the latest sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IchimokuLines {
    pub mid: i64,
    pub conversion_line: i64,
    pub baseline: i64,
    pub leading_span_a: i64,
    pub leading_span_b: i64,
    pub lagging_span: i64,
    /// Midprice `baseline` samples before `lagging_span`; `None` during warm-up.
    pub lagging_reference: Option<i64>,
}

impl IchimokuLines {
    /// Momentum classification. Buy is checked first and wins a tie.
    pub fn classify(&self) -> Signal {
        let mid = self.mid;
        let cloud_low = self.leading_span_a.min(self.leading_span_b);
        let cloud_high = self.leading_span_a.max(self.leading_span_b);

        let above_cloud = mid > cloud_low;
        let below_cloud = mid < cloud_high;
        let above_both = mid > self.conversion_line && mid > self.baseline;
        let below_both = mid < self.conversion_line && mid < self.baseline;

        let (lagging_above, lagging_below) = match self.lagging_reference {
            Some(r) => (self.lagging_span > r, self.lagging_span < r),
            None => (false, false),
        };

        if (above_cloud || above_both) && lagging_above {
            Signal::Buy
        } else if (below_cloud || below_both) && lagging_below {
            Signal::Sell
        } else {
            Signal::Neutral
        }
    }
}

/// Owns the four windows for one trading session.
#[derive(Debug, Clone)]
pub struct IchimokuIndicator {
    conversion: SlidingWindow,
    baseline: SlidingWindow,
    leading_span_b: SlidingWindow,
    // baseline + 1 slots: current sample plus the one `baseline` pushes back
    lagging: SlidingWindow,
    last: Option<IchimokuLines>,
}

impl IchimokuIndicator {
    pub fn new(periods: IchimokuPeriods) -> Self {
        Self {
            conversion: SlidingWindow::new(periods.conversion),
            baseline: SlidingWindow::new(periods.baseline),
            leading_span_b: SlidingWindow::new(periods.leading_span_b),
            lagging: SlidingWindow::new(periods.baseline + 1),
            last: None,
        }
    }

    /// Feed one midprice sample and classify it.
    pub fn update(&mut self, mid: i64) -> Signal {
        let conversion_line = self.conversion.push(mid);
        let baseline = self.baseline.push(conversion_line);
        let leading_span_a = (conversion_line + baseline) / 2;

        self.leading_span_b.push(conversion_line);
        let leading_span_b = (self.leading_span_b.sum() + baseline) / 2;

        self.lagging.push(mid);
        let lagging_reference = if self.lagging.is_full() { self.lagging.oldest() } else { None };

        let lines = IchimokuLines {
            mid,
            conversion_line,
            baseline,
            leading_span_a,
            leading_span_b,
            lagging_span: mid,
            lagging_reference,
        };
        self.last = Some(lines);
        lines.classify()
    }

    pub fn lines(&self) -> Option<&IchimokuLines> { self.last.as_ref() }

    /// Leading span B has a full period behind it.
    pub fn is_warm(&self) -> bool { self.leading_span_b.is_full() }

    #[cfg(test)]
    pub fn samples(&self) -> usize { self.leading_span_b.len() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn small() -> IchimokuIndicator {
        IchimokuIndicator::new(IchimokuPeriods { conversion: 2, baseline: 3, leading_span_b: 4 })
    }

    #[test]
    fn first_sample_lines() {
        let mut ind = small();
        assert_eq!(ind.update(1000), Signal::Neutral);
        let l = ind.lines().copied().unwrap();
        assert_eq!(l.conversion_line, 1000);
        assert_eq!(l.baseline, 1000);
        assert_eq!(l.leading_span_a, 1000);
        // (sum 1000 + baseline 1000) / 2
        assert_eq!(l.leading_span_b, 1000);
        assert_eq!(l.lagging_reference, None);
    }

    #[test]
    fn baseline_smooths_the_conversion_line() {
        let mut ind = small();
        ind.update(1000);
        ind.update(1200);
        let l = ind.lines().copied().unwrap();
        assert_eq!(l.conversion_line, 1100);
        // avg(1000, 1100)
        assert_eq!(l.baseline, 1050);
        assert_eq!(l.leading_span_a, 1075);
        // (1000 + 1100 + 1050) / 2
        assert_eq!(l.leading_span_b, 1575);
    }

    #[test]
    fn neutral_until_lagging_history_is_full() {
        let mut ind = small();
        for mid in [1000, 1100, 1200] {
            assert_eq!(ind.update(mid), Signal::Neutral);
        }
        // 4th sample: reference is the one 3 pushes back
        ind.update(1300);
        assert_eq!(ind.lines().unwrap().lagging_reference, Some(1000));
    }

    #[test]
    fn rising_prices_give_buy() {
        let mut ind = small();
        let mut last = Signal::Neutral;
        for i in 0..10 {
            last = ind.update(1000 + i * 100);
        }
        assert_eq!(last, Signal::Buy);
        assert!(ind.is_warm());
    }

    #[test]
    fn falling_prices_give_sell() {
        let mut ind = small();
        let mut last = Signal::Neutral;
        for i in 0..10 {
            last = ind.update(5000 - i * 100);
        }
        assert_eq!(last, Signal::Sell);
    }

    #[test]
    fn flat_prices_stay_neutral() {
        let mut ind = small();
        for _ in 0..20 {
            assert_eq!(ind.update(1000), Signal::Neutral);
        }
    }

    #[test]
    fn buy_wins_a_tie() {
        // not reachable through update(), lagging above/below are exclusive,
        // but classify() itself must check Buy first
        let lines = IchimokuLines {
            mid: 100,
            conversion_line: 50,
            baseline: 50,
            leading_span_a: 50,
            leading_span_b: 500,
            lagging_span: 100,
            lagging_reference: Some(90),
        };
        assert_eq!(lines.classify(), Signal::Buy);
    }

    #[test]
    fn warm_only_after_full_leading_span_b_period() {
        let mut ind = small();
        for i in 0..3 {
            ind.update(1000 + i);
            assert!(!ind.is_warm());
        }
        ind.update(1003);
        assert!(ind.is_warm());
        assert_eq!(ind.samples(), 4);
    }

    #[test]
    fn identical_histories_give_identical_signals() {
        let mut rng = StdRng::seed_from_u64(42);
        let mids: Vec<i64> = (0..500).map(|_| rng.gen_range(9_000..11_000)).collect();
        let periods = IchimokuPeriods { conversion: 9, baseline: 26, leading_span_b: 52 };

        let mut a = IchimokuIndicator::new(periods);
        let mut b = IchimokuIndicator::new(periods);
        let sa: Vec<Signal> = mids.iter().map(|&m| a.update(m)).collect();
        let sb: Vec<Signal> = mids.iter().map(|&m| b.update(m)).collect();
        assert_eq!(sa, sb);
        assert_eq!(a.lines(), b.lines());
    }
}
