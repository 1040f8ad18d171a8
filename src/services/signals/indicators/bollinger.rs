//! Bollinger Bands indicator.

use crate::types::BollBreakout;

use super::stats::{sma, std_dev};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl Bands {
    /// Zero bands mean "not enough history".
    pub fn is_empty(&self) -> bool {
        self.upper == 0.0 && self.middle == 0.0 && self.lower == 0.0
    }
}

/// Bollinger Bands indicator.
///
/// Consists of:
/// - Middle band: SMA(20)
/// - Upper band: SMA + 2 * StdDev
/// - Lower band: SMA - 2 * StdDev
///
/// The standard deviation is the population deviation of the same window.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

impl BollingerBands {
    pub fn calculate(&self, closes: &[f64]) -> Bands {
        if self.period == 0 || closes.len() < self.period {
            return Bands::default();
        }

        let middle = sma(closes, self.period);
        let band = self.std_dev_multiplier * std_dev(&closes[closes.len() - self.period..]);

        Bands {
            upper: middle + band,
            middle,
            lower: middle - band,
        }
    }

    /// Classify the last close against the bands.
    ///
    /// A close outside a band is a touch; two consecutive closes outside the
    /// same band is a breakout.
    pub fn breakout(closes: &[f64], bands: &Bands) -> BollBreakout {
        if closes.len() < 3 || bands.is_empty() {
            return BollBreakout::None;
        }

        let current = closes[closes.len() - 1];
        let previous = closes[closes.len() - 2];

        if current > bands.upper {
            if previous > bands.upper {
                BollBreakout::UpperBreakout
            } else {
                BollBreakout::UpperTouch
            }
        } else if current < bands.lower {
            if previous < bands.lower {
                BollBreakout::LowerBreakout
            } else {
                BollBreakout::LowerTouch
            }
        } else {
            BollBreakout::None
        }
    }
}
