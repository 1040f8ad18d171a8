//! KDJ stochastic oscillator.

use crate::types::Bar;

use super::stats::{max_of, min_of};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdjValue {
    pub k: f64,
    pub d: f64,
    pub j: f64,
}

impl Default for KdjValue {
    fn default() -> Self {
        Self {
            k: 50.0,
            d: 50.0,
            j: 50.0,
        }
    }
}

/// KDJ indicator.
///
/// RSV = (close - lowest low) / (highest high - lowest low) * 100 over the
/// period window. K smooths RSV with factor 1/3 seeded by the first RSV, D
/// smooths K the same way, and J = 3K - 2D. K and D are clamped to
/// `[0, 100]`; J is left unbounded.
pub struct Kdj {
    period: usize,
}

impl Default for Kdj {
    fn default() -> Self {
        Self { period: 9 }
    }
}

impl Kdj {
    pub fn calculate(&self, bars: &[Bar]) -> KdjValue {
        if self.period == 0 || bars.len() < self.period {
            return KdjValue::default();
        }

        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

        let rsvs: Vec<f64> = (self.period - 1..bars.len())
            .map(|i| {
                let window = i + 1 - self.period..=i;
                let highest = max_of(&highs[window.clone()]);
                let lowest = min_of(&lows[window]);
                if highest == lowest {
                    50.0
                } else {
                    (bars[i].close - lowest) / (highest - lowest) * 100.0
                }
            })
            .collect();

        let mut k = rsvs[0];
        let mut d = k;
        for rsv in rsvs.iter().skip(1) {
            k += (rsv - k) / 3.0;
            d += (k - d) / 3.0;
        }

        let j = 3.0 * k - 2.0 * d;

        KdjValue {
            k: k.clamp(0.0, 100.0),
            d: d.clamp(0.0, 100.0),
            j,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars_from(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: format!("2024-01-{:02}", i + 1),
                open: c,
                high: c + 1.0,
                low: c - 1.0,
                close: c,
                volume: 1000.0,
                amount: 0.0,
            })
            .collect()
    }

    #[test]
    fn test_kdj_insufficient_data() {
        let bars = bars_from(&[10.0; 8]);
        assert_eq!(Kdj::default().calculate(&bars), KdjValue::default());
    }

    #[test]
    fn test_kdj_uptrend_high() {
        let closes: Vec<f64> = (0..30).map(|i| 10.0 + i as f64).collect();
        let value = Kdj::default().calculate(&bars_from(&closes));
        assert!(value.k > 80.0, "K in uptrend should be high, got {}", value.k);
        assert!(value.j > 80.0, "J in uptrend should be high, got {}", value.j);
    }

    #[test]
    fn test_kdj_k_d_bounded() {
        let closes: Vec<f64> = (0..40)
            .map(|i| 50.0 + if i % 2 == 0 { 5.0 } else { -5.0 } * (i as f64 / 10.0))
            .collect();
        let value = Kdj::default().calculate(&bars_from(&closes));
        assert!((0.0..=100.0).contains(&value.k));
        assert!((0.0..=100.0).contains(&value.d));
    }

    #[test]
    fn test_kdj_flat_range_is_neutral() {
        let bars: Vec<Bar> = (0..12)
            .map(|i| Bar {
                date: format!("2024-01-{:02}", i + 1),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0,
                volume: 1.0,
                amount: 0.0,
            })
            .collect();
        let value = Kdj::default().calculate(&bars);
        assert_eq!(value, KdjValue::default());
    }
}
