//! Volume diagnostics: ratio, price/volume divergence, strength and breakout.

use tracing::trace;

use crate::types::PriceVolumeDivergence;

use super::stats::{adaptive_sma, mean, normalized_slope, std_dev};

/// Relative slope above which 5-bar prices count as rising.
const PRICE_SLOPE_THRESHOLD: f64 = 0.01;
/// Relative slope above which 5-bar volumes count as rising.
const VOLUME_SLOPE_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeProfile {
    pub current: f64,
    pub ma5: f64,
    pub ma10: f64,
    /// Current volume over MA5; 1.0 when MA5 is 0.
    pub ratio: f64,
    pub divergence: PriceVolumeDivergence,
    /// Z-score of current volume against the trailing 10, mapped into `[0, 3]`.
    pub strength: f64,
    pub breakout: bool,
}

pub fn analyze(closes: &[f64], volumes: &[f64]) -> VolumeProfile {
    let current = volumes.last().copied().unwrap_or(0.0);
    let ma5 = adaptive_sma(volumes, 5);
    let ma10 = adaptive_sma(volumes, 10);
    let ratio = if ma5 > 0.0 { current / ma5 } else { 1.0 };

    VolumeProfile {
        current,
        ma5,
        ma10,
        ratio,
        divergence: divergence(closes, volumes),
        strength: strength(volumes),
        breakout: breakout(volumes, ratio),
    }
}

/// Compare the slope of the last 5 closes with the last 5 volumes.
pub fn divergence(closes: &[f64], volumes: &[f64]) -> PriceVolumeDivergence {
    if closes.len() < 5 || volumes.len() < 5 {
        return PriceVolumeDivergence::Neutral;
    }

    let price_slope = normalized_slope(&closes[closes.len() - 5..]);
    let volume_slope = normalized_slope(&volumes[volumes.len() - 5..]);

    let price_up = price_slope > PRICE_SLOPE_THRESHOLD;
    let price_down = price_slope < -PRICE_SLOPE_THRESHOLD;
    let volume_up = volume_slope > VOLUME_SLOPE_THRESHOLD;
    let volume_down = volume_slope < -VOLUME_SLOPE_THRESHOLD;

    match (price_up, price_down, volume_up, volume_down) {
        (true, _, _, true) => PriceVolumeDivergence::BearishDivergence,
        (_, true, true, _) => PriceVolumeDivergence::BullishDivergence,
        (true, _, true, _) => PriceVolumeDivergence::HealthyUptrend,
        (_, true, _, true) => PriceVolumeDivergence::HealthyDowntrend,
        _ => PriceVolumeDivergence::Neutral,
    }
}

pub fn strength(volumes: &[f64]) -> f64 {
    if volumes.len() < 10 {
        return 1.0;
    }

    let recent = &volumes[volumes.len() - 10..];
    let sigma = std_dev(recent);
    if sigma == 0.0 {
        return 1.0;
    }

    let current = volumes[volumes.len() - 1];
    let z = (current - mean(recent)) / sigma;
    (1.0 + z * 0.5).clamp(0.0, 3.0)
}

/// A volume ratio above 2.0 counts as a breakout.
pub fn breakout(volumes: &[f64], ratio: f64) -> bool {
    if volumes.len() < 5 || ratio <= 2.0 {
        return false;
    }

    let recent = &volumes[volumes.len() - 3..];
    if recent[2] > recent[1] && recent[1] > recent[0] {
        trace!(ratio, "volume breakout confirmed by three rising sessions");
    }
    true
}
