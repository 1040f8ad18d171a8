//! Rule-based trend models and forecast synthesis.
//!
//! Three fixed heuristics vote on direction alongside the discrete signals.
//! Nothing here is learned; the weights are constants.

use crate::types::{
    Bar, BollBreakout, DailyChange, Indicators, MarketTrend, ModelPrediction, ModelPredictions,
    PriceVolumeDivergence, Signal, SignalKind, TargetPrices, Trend,
};

/// Base forecast move before momentum and volatility scaling.
const BASE_FACTOR: f64 = 0.05;

/// Evaluate the moving-average, MACD and RSI models.
pub fn generate_model_predictions(ind: &Indicators) -> ModelPredictions {
    let (ma_trend, ma_confidence) = moving_average_model(ind);
    let (macd_trend, macd_confidence) = macd_model(ind);
    let (rsi_trend, rsi_confidence) = rsi_model(ind);

    let factor = BASE_FACTOR * momentum_multiplier(ind.momentum_score)
        * volatility_multiplier(ind.volatility);

    let project = |trend: Trend, confidence: f64, weight: f64| -> f64 {
        let step = factor * weight * confidence;
        match trend {
            Trend::Up => ind.current_price * (1.0 + step),
            Trend::Down => ind.current_price * (1.0 - step),
            Trend::Sideways => ind.current_price,
        }
    };

    ModelPredictions {
        moving_average: ModelPrediction {
            trend: ma_trend,
            price: project(ma_trend, ma_confidence, 1.0),
            confidence: ma_confidence,
        },
        macd: ModelPrediction {
            trend: macd_trend,
            price: project(macd_trend, macd_confidence, 0.8),
            confidence: macd_confidence,
        },
        rsi: ModelPrediction {
            trend: rsi_trend,
            price: project(rsi_trend, rsi_confidence, 1.2),
            confidence: rsi_confidence,
        },
    }
}

fn moving_average_model(ind: &Indicators) -> (Trend, f64) {
    let aligned_up = ind.ma5 > ind.ma10 && ind.ma10 > ind.ma20;
    let aligned_down = ind.ma5 < ind.ma10 && ind.ma10 < ind.ma20;
    let above = ind.current_price > ind.ma5;
    let below = ind.current_price < ind.ma5;

    let strong = ind.change_5d > 5.0 || ind.ma5_slope > 1.0;
    let weak = ind.change_5d < -5.0 || ind.ma5_slope < -1.0;
    let very_strong = ind.change_5d > 15.0 || ind.momentum_score > 80.0;
    let very_weak = ind.change_5d < -15.0 || ind.momentum_score < 20.0;

    if very_strong || (aligned_up && above && strong) {
        (Trend::Up, if very_strong { 0.95 } else { 0.85 })
    } else if (aligned_up && above) || strong {
        (Trend::Up, 0.7)
    } else if very_weak || (aligned_down && below && weak) {
        (Trend::Down, if very_weak { 0.95 } else { 0.85 })
    } else if (aligned_down && below) || weak {
        (Trend::Down, 0.7)
    } else {
        (Trend::Sideways, 0.5)
    }
}

fn macd_model(ind: &Indicators) -> (Trend, f64) {
    if ind.macd > ind.macd_signal && ind.macd_hist > 0.0 {
        (Trend::Up, if ind.macd_hist > 0.1 { 0.75 } else { 0.65 })
    } else if ind.macd < ind.macd_signal && ind.macd_hist < 0.0 {
        (Trend::Down, if ind.macd_hist < -0.1 { 0.75 } else { 0.65 })
    } else {
        (Trend::Sideways, 0.5)
    }
}

fn rsi_model(ind: &Indicators) -> (Trend, f64) {
    if ind.rsi < 30.0 {
        (Trend::Up, 0.65)
    } else if ind.rsi > 70.0 {
        // Overbought names with strong momentum tend to keep running
        if ind.change_1d > 3.0 || ind.change_5d > 8.0 {
            (Trend::Up, 0.6)
        } else {
            (Trend::Down, 0.55)
        }
    } else if ind.rsi > 50.0 && ind.change_5d > 3.0 {
        (Trend::Up, 0.6)
    } else if ind.rsi < 50.0 && ind.change_5d < -3.0 {
        (Trend::Down, 0.6)
    } else {
        (Trend::Sideways, 0.5)
    }
}

fn momentum_multiplier(score: f64) -> f64 {
    if score > 80.0 {
        3.0
    } else if score > 70.0 {
        2.5
    } else if score > 60.0 {
        2.0
    } else if score > 50.0 {
        1.5
    } else {
        1.0
    }
}

fn volatility_multiplier(volatility: f64) -> f64 {
    if volatility > 0.08 {
        2.0
    } else if volatility > 0.05 {
        1.5
    } else {
        1.0
    }
}

/// Voting weight of a signal in the trend decision.
fn signal_weight(signal: &Signal, ind: &Indicators) -> f64 {
    match signal.name {
        SignalKind::Breakout => match ind.boll_breakout {
            BollBreakout::UpperBreakout | BollBreakout::LowerBreakout => 1.0,
            BollBreakout::UpperTouch | BollBreakout::LowerTouch => 0.8,
            BollBreakout::None => 0.5,
        },
        SignalKind::Momentum if ind.momentum_score >= 80.0 && signal.signal_type.is_bullish() => 0.9,
        SignalKind::Momentum if signal.signal_type.is_bullish() => 0.7,
        SignalKind::PriceVolume => match ind.price_volume_divergence {
            PriceVolumeDivergence::BearishDivergence | PriceVolumeDivergence::BullishDivergence => {
                0.8
            }
            _ => 0.5,
        },
        SignalKind::Market => 0.7,
        _ => 0.5,
    }
}

/// Combine model and signal votes into a direction and confidence.
///
/// Confidence is the mean model confidence adjusted for regime and volatility.
/// A call against the prevailing regime is discounted and downgraded to
/// sideways when it no longer clears 0.6. Result is in `[0.1, 1.0]`.
pub fn determine_trend(
    models: &ModelPredictions,
    signals: &[Signal],
    ind: &Indicators,
) -> (Trend, f64) {
    let mut bullish = 0usize;
    let mut bearish = 0usize;
    let mut weighted_bullish = 0.0;
    let mut weighted_bearish = 0.0;
    let mut total_confidence = 0.0;

    for model in models.iter() {
        match model.trend {
            Trend::Up => {
                bullish += 1;
                weighted_bullish += model.confidence;
            }
            Trend::Down => {
                bearish += 1;
                weighted_bearish += model.confidence;
            }
            Trend::Sideways => {}
        }
        total_confidence += model.confidence;
    }

    for signal in signals {
        let weight = signal_weight(signal, ind);
        if signal.signal_type.is_bullish() {
            bullish += 1;
            weighted_bullish += weight;
        } else if signal.signal_type.is_bearish() {
            bearish += 1;
            weighted_bearish += weight;
        }
    }

    let mut confidence =
        adjust_confidence_by_market(total_confidence / 3.0, ind.market_trend, ind.volatility);

    let trend = if bullish > bearish || weighted_bullish > weighted_bearish + 0.3 {
        if ind.market_trend == MarketTrend::Bear {
            confidence *= 0.7;
            if confidence < 0.6 {
                Trend::Sideways
            } else {
                Trend::Up
            }
        } else {
            Trend::Up
        }
    } else if bearish > bullish || weighted_bearish > weighted_bullish + 0.3 {
        if ind.market_trend == MarketTrend::Bull {
            confidence *= 0.7;
            if confidence < 0.6 {
                Trend::Sideways
            } else {
                Trend::Down
            }
        } else {
            Trend::Down
        }
    } else {
        confidence *= 0.8;
        Trend::Sideways
    };

    (trend, confidence.clamp(0.1, 1.0))
}

fn adjust_confidence_by_market(base: f64, market: MarketTrend, volatility: f64) -> f64 {
    let mut adjusted = base;

    if volatility > 0.1 {
        adjusted *= if base > 0.8 { 1.1 } else { 0.9 };
    } else if volatility > 0.05 {
        adjusted *= if base > 0.7 { 1.05 } else { 0.95 };
    }

    match market {
        MarketTrend::Bull if base > 0.7 => adjusted *= 1.1,
        MarketTrend::Bear if base < 0.4 => adjusted *= 1.1,
        MarketTrend::Sideways => adjusted *= 0.9,
        _ => {}
    }

    adjusted.clamp(0.1, 1.0)
}

/// Short, medium and long targets scaled by confidence (floored at 0.3).
pub fn target_prices(current_price: f64, trend: Trend, confidence: f64) -> TargetPrices {
    let factor = confidence.max(0.3);
    match trend {
        Trend::Up => TargetPrices {
            short: current_price * (1.0 + 0.03 * factor),
            medium: current_price * (1.0 + 0.08 * factor),
            long: current_price * (1.0 + 0.15 * factor),
        },
        Trend::Down => TargetPrices {
            short: current_price * (1.0 - 0.03 * factor),
            medium: current_price * (1.0 - 0.08 * factor),
            long: current_price * (1.0 - 0.15 * factor),
        },
        Trend::Sideways => TargetPrices {
            short: current_price * (1.0 + 0.01 * factor),
            medium: current_price,
            long: current_price * (1.0 - 0.01 * factor),
        },
    }
}

/// Close-to-close changes for the last `days` bars.
pub fn daily_changes(bars: &[Bar], days: usize) -> Vec<DailyChange> {
    let n = bars.len();
    if n < 2 {
        return Vec::new();
    }

    let start = n.saturating_sub(days).max(1);
    (start..n)
        .map(|i| {
            let prev = bars[i - 1].close;
            let change = if prev > 0.0 {
                (bars[i].close - prev) / prev * 100.0
            } else {
                0.0
            };
            DailyChange {
                date: bars[i].date.clone(),
                change,
                close: bars[i].close,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalType;

    fn base() -> Indicators {
        Indicators {
            current_price: 100.0,
            ma5: 100.0,
            ma10: 100.0,
            ma20: 100.0,
            rsi: 50.0,
            momentum_score: 40.0,
            volatility: 0.03,
            ..Indicators::default()
        }
    }

    #[test]
    fn test_neutral_models_hold_price() {
        let models = generate_model_predictions(&base());
        for model in models.iter() {
            assert_eq!(model.trend, Trend::Sideways);
            assert_eq!(model.price, 100.0);
            assert_eq!(model.confidence, 0.5);
        }
    }

    #[test]
    fn test_strong_uptrend_models() {
        let ind = Indicators {
            current_price: 110.0,
            ma5: 105.0,
            ma10: 102.0,
            ma20: 100.0,
            macd: 1.0,
            macd_signal: 0.5,
            macd_hist: 0.5,
            rsi: 60.0,
            change_5d: 6.0,
            momentum_score: 75.0,
            volatility: 0.03,
            ..Indicators::default()
        };
        let models = generate_model_predictions(&ind);
        assert_eq!(models.moving_average.trend, Trend::Up);
        assert_eq!(models.moving_average.confidence, 0.85);
        assert_eq!(models.macd.trend, Trend::Up);
        assert_eq!(models.macd.confidence, 0.75);
        assert_eq!(models.rsi.trend, Trend::Up);
        assert!(models.moving_average.price > 110.0);
        // factor = 0.05 * 2.5 * 1.0
        let expected = 110.0 * (1.0 + 0.125 * 0.85);
        assert!((models.moving_average.price - expected).abs() < 1e-9);
    }

    #[test]
    fn test_overbought_without_momentum_turns_down() {
        let ind = Indicators { rsi: 75.0, ..base() };
        assert_eq!(generate_model_predictions(&ind).rsi.trend, Trend::Down);

        let ind = Indicators {
            rsi: 75.0,
            change_1d: 4.0,
            ..base()
        };
        assert_eq!(generate_model_predictions(&ind).rsi.trend, Trend::Up);
    }

    #[test]
    fn test_determine_trend_majority() {
        let ind = base();
        let models = generate_model_predictions(&ind);
        let signals = vec![
            Signal::bullish(SignalKind::Macd, "golden cross"),
            Signal::bullish(SignalKind::Volume, "volume surge"),
            Signal::neutral(SignalKind::Kdj, "neutral"),
        ];
        let (trend, confidence) = determine_trend(&models, &signals, &ind);
        assert_eq!(trend, Trend::Up);
        assert!((0.1..=1.0).contains(&confidence));
    }

    #[test]
    fn test_counter_regime_call_downgraded() {
        let ind = Indicators {
            market_trend: MarketTrend::Bear,
            ..base()
        };
        let models = generate_model_predictions(&ind);
        let signals = vec![Signal::bullish(SignalKind::Macd, "golden cross")];
        let (trend, _) = determine_trend(&models, &signals, &ind);
        assert_eq!(trend, Trend::Sideways);
    }

    #[test]
    fn test_determine_trend_tie_is_sideways() {
        let ind = base();
        let models = generate_model_predictions(&ind);
        let signals = vec![
            Signal::bullish(SignalKind::Macd, "golden cross"),
            Signal::new(SignalKind::Volume, SignalType::Bearish, "volume shrink"),
        ];
        let (trend, confidence) = determine_trend(&models, &signals, &ind);
        assert_eq!(trend, Trend::Sideways);
        // 0.5 * 0.9 (range-bound market) * 0.8
        assert!((confidence - 0.36).abs() < 1e-9);
    }

    #[test]
    fn test_target_prices() {
        let up = target_prices(100.0, Trend::Up, 0.5);
        assert!((up.short - 101.5).abs() < 1e-9);
        assert!((up.long - 107.5).abs() < 1e-9);

        let down = target_prices(100.0, Trend::Down, 0.1);
        assert!((down.short - 99.1).abs() < 1e-9);

        let flat = target_prices(100.0, Trend::Sideways, 0.5);
        assert_eq!(flat.medium, 100.0);
        assert!(flat.short > flat.long);
    }

    #[test]
    fn test_daily_changes() {
        let bars: Vec<Bar> = (0..15)
            .map(|i| Bar {
                date: format!("2024-04-{:02}", i + 1),
                open: 10.0,
                high: 10.0,
                low: 10.0,
                close: 10.0 + i as f64,
                volume: 1.0,
                amount: 0.0,
            })
            .collect();
        let changes = daily_changes(&bars, 10);
        assert_eq!(changes.len(), 10);
        assert_eq!(changes[9].date, "2024-04-15");
        assert!((changes[9].change - 1.0 / 23.0 * 100.0).abs() < 1e-9);

        assert_eq!(daily_changes(&bars[..3], 10).len(), 2);
        assert!(daily_changes(&bars[..1], 10).is_empty());
    }
}
