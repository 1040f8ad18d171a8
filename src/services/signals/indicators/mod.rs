//! Technical indicator implementations and the engine that assembles them
//! into a single [`Indicators`] record.
//!
//! Everything here is pure. Short histories degrade to neutral values; only
//! an empty bar slice is an error.

pub mod bollinger;
pub mod chips;
pub mod index;
pub mod kdj;
pub mod macd;
pub mod regime;
pub mod rsi;
pub mod sentiment;
pub mod stats;
pub mod volume;

pub use bollinger::{Bands, BollingerBands};
pub use kdj::{Kdj, KdjValue};
pub use macd::{Macd, MacdValue};
pub use rsi::{Rsi, RsiThresholds};

use crate::error::{AppError, Result};
use crate::types::{Bar, Indicators};

use regime::MomentumInputs;
use stats::{adaptive_sma, max_of, min_of, pct_change, sma};

/// Compute the full indicator bundle for the last bar of `bars`.
///
/// `bars` must be ascending by date.
pub fn compute(bars: &[Bar]) -> Result<Indicators> {
    let Some(last) = bars.last() else {
        return Err(AppError::BadRequest("bar series is empty".to_string()));
    };

    let n = bars.len();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let current_price = last.close;

    let macd = Macd::default().calculate(&closes);
    let rsi = Rsi::default();
    let rsi_value = rsi.calculate(&closes);
    let thresholds = rsi.dynamic_thresholds(&closes);
    let kdj = Kdj::default().calculate(bars);
    let bands = BollingerBands::default().calculate(&closes);

    let lookback = &bars[n - n.min(20)..];
    let lows: Vec<f64> = lookback.iter().map(|b| b.low).collect();
    let highs: Vec<f64> = lookback.iter().map(|b| b.high).collect();

    let change_over = |k: usize| -> f64 {
        if n > k {
            pct_change(closes[n - 1 - k], current_price)
        } else {
            0.0
        }
    };

    // MA5 now versus MA5 three bars ago
    let ma5_slope = if n >= 8 {
        let now = sma(&closes, 5);
        let before = sma(&closes[..n - 3], 5);
        if before > 0.0 {
            (now - before) / before * 100.0
        } else {
            0.0
        }
    } else {
        0.0
    };

    let volume = volume::analyze(&closes, &volumes);
    let regime = regime::market_regime(&closes);
    let boll_breakout = BollingerBands::breakout(&closes, &bands);
    let price_acceleration = regime::price_acceleration(&closes);
    let change_5d = change_over(5);

    let momentum_score = regime::momentum_score(&MomentumInputs {
        change_5d,
        volume_breakout: volume.breakout,
        volume_ratio: volume.ratio,
        rsi: rsi_value,
        macd: macd.macd,
        macd_signal: macd.signal,
        boll_breakout,
        price_acceleration,
    });

    let sentiment = sentiment::analyze(bars, volume.ratio);
    let chips = chips::analyze(bars);

    Ok(Indicators {
        current_price,
        ma5: adaptive_sma(&closes, 5),
        ma10: adaptive_sma(&closes, 10),
        ma20: adaptive_sma(&closes, 20),
        ma60: adaptive_sma(&closes, 60),
        macd: macd.macd,
        macd_signal: macd.signal,
        macd_hist: macd.hist,
        rsi: rsi_value,
        kdj_k: kdj.k,
        kdj_d: kdj.d,
        kdj_j: kdj.j,
        boll_upper: bands.upper,
        boll_middle: bands.middle,
        boll_lower: bands.lower,
        support_level: min_of(&lows),
        resistance_level: max_of(&highs),
        change_1d: change_over(1),
        change_5d,
        change_10d: change_over(10),
        ma5_slope,
        current_volume: volume.current,
        volume_ma5: volume.ma5,
        volume_ma10: volume.ma10,
        volume_ratio: volume.ratio,
        price_volume_divergence: volume.divergence,
        volume_strength: volume.strength,
        rsi_upper_threshold: thresholds.upper,
        rsi_lower_threshold: thresholds.lower,
        market_trend: regime.trend,
        volatility: regime.volatility,
        trend_strength: regime.trend_strength,
        boll_breakout,
        volume_breakout: volume.breakout,
        price_acceleration,
        momentum_score,
        amplitude: sentiment.amplitude,
        avg_amplitude_5d: sentiment.avg_amplitude_5d,
        upper_shadow_ratio: sentiment.upper_shadow_ratio,
        lower_shadow_ratio: sentiment.lower_shadow_ratio,
        continuous_days: sentiment.continuous_days,
        sentiment_strength: sentiment.strength,
        sentiment_type: sentiment.sentiment_type,
        main_force_cost_20: chips.cost_20,
        main_force_cost_60: chips.cost_60,
        cost_deviation_20: chips.deviation_20,
        cost_deviation_60: chips.deviation_60,
        chip_concentration: chips.concentration,
        main_force_profit: chips.deviation_20,
        index: None,
    })
}

/// Attach index-relative metrics to an already computed bundle.
///
/// Signals derived from the old bundle are stale afterwards and must be
/// regenerated. An empty stock or index series leaves the bundle unchanged.
pub fn apply_index(indicators: &mut Indicators, stock: &[Bar], index_code: &str, index: &[Bar]) {
    if stock.is_empty() || index.is_empty() {
        return;
    }
    indicators.index = Some(index::index_metrics(index_code, stock, index));
}
