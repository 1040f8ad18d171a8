//! Relative Strength Index (RSI) indicator.

use super::stats::{mean, std_dev};

/// RSI (Relative Strength Index) indicator.
///
/// Measures momentum by comparing the magnitude of recent gains to recent losses.
/// Seed averages are the simple mean of the first `period` deltas, after which
/// Wilder smoothing with `alpha = 1/period` is applied.
pub struct Rsi {
    period: usize,
}

impl Default for Rsi {
    fn default() -> Self {
        Self { period: 14 }
    }
}

/// Overbought/oversold levels adapted to the security's own RSI history.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiThresholds {
    pub upper: f64,
    pub lower: f64,
}

impl Default for RsiThresholds {
    fn default() -> Self {
        Self {
            upper: 70.0,
            lower: 30.0,
        }
    }
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn min_periods(&self) -> usize {
        self.period + 1
    }

    /// RSI of the last close, in `[0, 100]`.
    ///
    /// 50 when fewer than `period + 1` closes exist; 100 when there were no losses.
    pub fn calculate(&self, closes: &[f64]) -> f64 {
        if self.period == 0 || closes.len() < self.min_periods() {
            return 50.0;
        }

        let mut gains = Vec::with_capacity(closes.len() - 1);
        let mut losses = Vec::with_capacity(closes.len() - 1);
        for pair in closes.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                gains.push(change);
                losses.push(0.0);
            } else {
                gains.push(0.0);
                losses.push(-change);
            }
        }

        let period = self.period as f64;
        let mut avg_gain = gains[..self.period].iter().sum::<f64>() / period;
        let mut avg_loss = losses[..self.period].iter().sum::<f64>() / period;

        let alpha = 1.0 / period;
        for i in self.period..gains.len() {
            avg_gain = alpha * gains[i] + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * losses[i] + (1.0 - alpha) * avg_loss;
        }

        if avg_loss == 0.0 {
            return 100.0;
        }

        let rs = avg_gain / avg_loss;
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }

    /// Thresholds from the distribution of RSI over the early part of the series.
    ///
    /// RSI is evaluated on prefixes ending at bars 14..30; the bands are
    /// mean ± 1.5σ, capped to `[15, 85]`. An upper band below 60 or a lower
    /// band above 40 is replaced by the fixed 70/30 level.
    pub fn dynamic_thresholds(&self, closes: &[f64]) -> RsiThresholds {
        if closes.len() < 30 {
            return RsiThresholds::default();
        }

        let values: Vec<f64> = (14..30).map(|i| self.calculate(&closes[..=i])).collect();

        let avg = mean(&values);
        let sigma = std_dev(&values);

        let mut upper = (avg + 1.5 * sigma).min(85.0);
        let mut lower = (avg - 1.5 * sigma).max(15.0);

        if upper < 60.0 {
            upper = 70.0;
        }
        if lower > 40.0 {
            lower = 30.0;
        }

        RsiThresholds { upper, lower }
    }
}
