//! MACD (Moving Average Convergence Divergence) indicator.

use super::stats::ema_series;

/// MACD line, signal line and histogram for the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdValue {
    pub macd: f64,
    pub signal: f64,
    pub hist: f64,
}

/// MACD indicator.
///
/// - MACD Line (DIF) = EMA(12) - EMA(26), from the first bar where both exist
/// - Signal Line = EMA(9) of the MACD Line
/// - Histogram = MACD Line - Signal Line
///
/// When the MACD line is shorter than the signal period the signal EMA runs
/// over whatever points exist.
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Default for Macd {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

impl Macd {
    pub fn min_periods(&self) -> usize {
        self.slow_period
    }

    /// All zeros when fewer than `slow_period` closes exist.
    pub fn calculate(&self, closes: &[f64]) -> MacdValue {
        if closes.len() < self.min_periods() {
            return MacdValue::default();
        }

        let (Some(fast), Some(slow)) = (
            ema_series(closes, self.fast_period),
            ema_series(closes, self.slow_period),
        ) else {
            return MacdValue::default();
        };

        let start = self.slow_period - 1;
        let dif: Vec<f64> = (start..closes.len()).map(|i| fast[i] - slow[i]).collect();

        let signal_period = self.signal_period.min(dif.len());
        let Some(dea) = ema_series(&dif, signal_period) else {
            return MacdValue::default();
        };

        let macd = dif[dif.len() - 1];
        let signal = dea[dea.len() - 1];

        MacdValue {
            macd,
            signal,
            hist: macd - signal,
        }
    }
}
