//! Market regime, price acceleration and the composite momentum score.

use crate::types::{BollBreakout, MarketTrend};

use super::stats::{mean, normalized_slope, pct_change, r_squared, std_dev};

const REGIME_WINDOW: usize = 20;
/// Fitted relative change across the window needed to call a trend.
const REGIME_SLOPE_THRESHOLD: f64 = 0.02;
const REGIME_STRENGTH_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regime {
    pub trend: MarketTrend,
    /// Standard deviation over mean of the window.
    pub volatility: f64,
    /// R² of the linear fit.
    pub trend_strength: f64,
}

impl Default for Regime {
    fn default() -> Self {
        Self {
            trend: MarketTrend::Sideways,
            volatility: 0.1,
            trend_strength: 0.5,
        }
    }
}

pub fn market_regime(closes: &[f64]) -> Regime {
    if closes.len() < REGIME_WINDOW {
        return Regime::default();
    }

    let recent = &closes[closes.len() - REGIME_WINDOW..];
    let avg = mean(recent);
    let volatility = if avg != 0.0 { std_dev(recent) / avg } else { 0.0 };

    let window_change = normalized_slope(recent) * (recent.len() - 1) as f64;
    let trend_strength = r_squared(recent);

    let trend = if window_change.abs() > REGIME_SLOPE_THRESHOLD
        && trend_strength > REGIME_STRENGTH_THRESHOLD
    {
        if window_change > 0.0 {
            MarketTrend::Bull
        } else {
            MarketTrend::Bear
        }
    } else {
        MarketTrend::Sideways
    };

    Regime {
        trend,
        volatility,
        trend_strength,
    }
}

/// Average change of the daily % change over the last 5 closes.
pub fn price_acceleration(closes: &[f64]) -> f64 {
    if closes.len() < 5 {
        return 0.0;
    }

    let recent = &closes[closes.len() - 5..];
    let changes: Vec<f64> = recent.windows(2).map(|w| pct_change(w[0], w[1])).collect();
    let deltas: Vec<f64> = changes.windows(2).map(|w| w[1] - w[0]).collect();
    mean(&deltas)
}

/// Inputs to the momentum score.
#[derive(Debug, Clone, Copy)]
pub struct MomentumInputs {
    pub change_5d: f64,
    pub volume_breakout: bool,
    pub volume_ratio: f64,
    pub rsi: f64,
    pub macd: f64,
    pub macd_signal: f64,
    pub boll_breakout: BollBreakout,
    pub price_acceleration: f64,
}

/// Weighted 0-100 momentum score.
pub fn momentum_score(inputs: &MomentumInputs) -> f64 {
    let mut score: f64 = 0.0;

    // Price momentum
    if inputs.change_5d > 10.0 {
        score += 30.0;
    } else if inputs.change_5d > 5.0 {
        score += 20.0;
    } else if inputs.change_5d > 0.0 {
        score += 10.0;
    }

    // Volume momentum
    if inputs.volume_breakout {
        score += 25.0;
    } else if inputs.volume_ratio > 1.5 {
        score += 15.0;
    } else if inputs.volume_ratio > 1.0 {
        score += 10.0;
    }

    // Oscillator alignment
    let rsi_bullish = inputs.rsi > 50.0;
    let macd_bullish = inputs.macd > inputs.macd_signal;
    if rsi_bullish && macd_bullish {
        score += 25.0;
    } else if rsi_bullish || macd_bullish {
        score += 15.0;
    }

    score += match inputs.boll_breakout {
        BollBreakout::UpperBreakout => 20.0,
        BollBreakout::UpperTouch => 10.0,
        BollBreakout::LowerTouch => -10.0,
        BollBreakout::LowerBreakout => -20.0,
        BollBreakout::None => 0.0,
    };

    if inputs.price_acceleration > 2.0 {
        score += 10.0;
    } else if inputs.price_acceleration < -2.0 {
        score -= 10.0;
    }

    score.clamp(0.0, 100.0)
}
