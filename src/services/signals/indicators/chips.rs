//! Main-force cost estimates and chip concentration.
//!
//! The cost estimate assumes accumulation happened somewhat above the
//! trailing low, so it is the trailing low times a fixed markup.

use crate::types::Bar;

use super::stats::{min_of, pct_change};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChipCost {
    pub cost_20: f64,
    pub cost_60: f64,
    pub deviation_20: f64,
    pub deviation_60: f64,
    /// `1 / (1 + 10 * relative volume-weighted deviation)`, in `(0, 1]`.
    pub concentration: f64,
}

pub fn analyze(bars: &[Bar]) -> ChipCost {
    let current = bars.last().map(|b| b.close).unwrap_or(0.0);
    let (cost_20, cost_60) = main_force_cost(bars);

    ChipCost {
        cost_20,
        cost_60,
        deviation_20: cost_deviation(current, cost_20),
        deviation_60: cost_deviation(current, cost_60),
        concentration: concentration(bars),
    }
}

/// Short and medium term cost estimates.
///
/// Short: lowest low of the last 90 bars × 1.15 (needs 20 bars, else close × 0.8).
/// Medium: lowest low of the last 180 bars × 1.18 (needs 60 bars, else the
/// short estimate with 20+ bars, else close × 0.75).
pub fn main_force_cost(bars: &[Bar]) -> (f64, f64) {
    let n = bars.len();
    let Some(last) = bars.last() else {
        return (0.0, 0.0);
    };

    let trailing_low = |window: usize| -> f64 {
        let lows: Vec<f64> = bars[n - window..].iter().map(|b| b.low).collect();
        min_of(&lows)
    };

    let short_window = n.min(90);
    let cost_20 = if short_window >= 20 {
        trailing_low(short_window) * 1.15
    } else {
        last.close * 0.8
    };

    let long_window = n.min(180);
    let cost_60 = if long_window >= 60 {
        trailing_low(long_window) * 1.18
    } else if long_window >= 20 {
        cost_20
    } else {
        last.close * 0.75
    };

    (cost_20, cost_60)
}

/// Percent distance of `price` above `cost`; 0 for a zero cost.
pub fn cost_deviation(price: f64, cost: f64) -> f64 {
    pct_change(cost, price)
}

pub fn concentration(bars: &[Bar]) -> f64 {
    let n = bars.len();
    if n < 20 {
        return 0.5;
    }

    let window = &bars[n - n.min(60)..];
    let total_volume: f64 = window.iter().map(|b| b.volume).sum();
    if total_volume <= 0.0 {
        return 0.5;
    }

    let vwap = window
        .iter()
        .map(|b| b.typical_price() * b.volume)
        .sum::<f64>()
        / total_volume;
    if vwap <= 0.0 {
        return 0.5;
    }

    let variance = window
        .iter()
        .map(|b| (b.typical_price() - vwap).powi(2) * b.volume)
        .sum::<f64>()
        / total_volume;

    let relative = variance.sqrt() / vwap;
    1.0 / (1.0 + relative * 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(count: usize, price: impl Fn(usize) -> f64) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let c = price(i);
                Bar {
                    date: format!("day-{}", i),
                    open: c,
                    high: c * 1.01,
                    low: c * 0.99,
                    close: c,
                    volume: 1000.0,
                    amount: 0.0,
                }
            })
            .collect()
    }

    #[test]
    fn test_cost_short_history() {
        let data = bars(10, |_| 10.0);
        let (c20, c60) = main_force_cost(&data);
        assert!((c20 - 8.0).abs() < 1e-12);
        assert!((c60 - 7.5).abs() < 1e-12);
    }

    #[test]
    fn test_cost_medium_history() {
        let data = bars(30, |_| 10.0);
        let (c20, c60) = main_force_cost(&data);
        assert!((c20 - 9.9 * 1.15).abs() < 1e-9);
        assert_eq!(c20, c60);
    }

    #[test]
    fn test_cost_long_history() {
        let data = bars(70, |i| 10.0 + i as f64 * 0.1);
        let (_, c60) = main_force_cost(&data);
        assert!((c60 - 9.9 * 1.18).abs() < 1e-9);
    }

    #[test]
    fn test_cost_deviation() {
        assert!((cost_deviation(11.0, 10.0) - 10.0).abs() < 1e-12);
        assert_eq!(cost_deviation(11.0, 0.0), 0.0);
    }

    #[test]
    fn test_concentration_range() {
        assert_eq!(concentration(&bars(10, |_| 10.0)), 0.5);

        let tight = concentration(&bars(40, |_| 10.0));
        let wide = concentration(&bars(40, |i| 5.0 + i as f64));
        assert!(tight > wide, "tight {} should exceed wide {}", tight, wide);
        assert!(tight > 0.0 && tight <= 1.0);
        assert!(wide > 0.0 && wide <= 1.0);
    }

    #[test]
    fn test_concentration_without_volume() {
        let mut data = bars(25, |_| 10.0);
        for b in &mut data {
            b.volume = 0.0;
        }
        assert_eq!(concentration(&data), 0.5);
    }
}
