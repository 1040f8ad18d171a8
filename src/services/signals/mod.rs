//! Trading signals service module.
//!
//! Provides the indicator engine, the mapping from indicators to discrete
//! signals, and the rule-based trend models built on top of both.

pub mod indicators;
pub mod predictions;

pub use indicators::{apply_index, compute};

use crate::types::{
    BollBreakout, Indicators, MarketTrend, PriceVolumeDivergence, SentimentType, Signal,
    SignalKind,
};

/// Map an indicator bundle to its ordered list of signals.
///
/// Always emits the thirteen core signals; the index, relative-strength and
/// beta signals are appended only when index metrics are present. A value
/// sitting exactly on a threshold falls through to the next branch.
pub fn classify(ind: &Indicators) -> Vec<Signal> {
    let mut signals = Vec::with_capacity(16);

    signals.push(if ind.macd > ind.macd_signal {
        Signal::bullish(SignalKind::Macd, "golden cross")
    } else if ind.macd < ind.macd_signal {
        Signal::bearish(SignalKind::Macd, "death cross")
    } else {
        Signal::neutral(SignalKind::Macd, "no cross")
    });

    signals.push(if ind.rsi > ind.rsi_upper_threshold {
        Signal::bearish(
            SignalKind::Rsi,
            format!("overbought (above {:.1})", ind.rsi_upper_threshold),
        )
    } else if ind.rsi < ind.rsi_lower_threshold {
        Signal::bullish(
            SignalKind::Rsi,
            format!("oversold (below {:.1})", ind.rsi_lower_threshold),
        )
    } else {
        Signal::neutral(SignalKind::Rsi, "neutral")
    });

    signals.push(if ind.kdj_j > 80.0 {
        Signal::bearish(SignalKind::Kdj, "overbought")
    } else if ind.kdj_j < 20.0 {
        Signal::bullish(SignalKind::Kdj, "oversold")
    } else {
        Signal::neutral(SignalKind::Kdj, "neutral")
    });

    signals.push(if ind.current_price > ind.ma5 && ind.ma5 > ind.ma20 {
        Signal::bullish(SignalKind::MovingAverage, "bullish alignment")
    } else if ind.current_price < ind.ma5 && ind.ma5 < ind.ma20 {
        Signal::bearish(SignalKind::MovingAverage, "bearish alignment")
    } else {
        Signal::neutral(SignalKind::MovingAverage, "tangled")
    });

    signals.push(if ind.volume_ratio > 2.0 {
        Signal::bullish(SignalKind::Volume, "volume surge")
    } else if ind.volume_ratio < 0.5 {
        Signal::bearish(SignalKind::Volume, "volume shrink")
    } else {
        Signal::neutral(SignalKind::Volume, "normal")
    });

    signals.push(match ind.price_volume_divergence {
        PriceVolumeDivergence::BearishDivergence => {
            Signal::bearish(SignalKind::PriceVolume, "bearish divergence")
        }
        PriceVolumeDivergence::BullishDivergence => {
            Signal::bullish(SignalKind::PriceVolume, "bullish divergence")
        }
        PriceVolumeDivergence::HealthyUptrend => {
            Signal::bullish(SignalKind::PriceVolume, "price and volume rising")
        }
        PriceVolumeDivergence::HealthyDowntrend => {
            Signal::bearish(SignalKind::PriceVolume, "price and volume falling")
        }
        PriceVolumeDivergence::Neutral => Signal::neutral(SignalKind::PriceVolume, "neutral"),
    });

    signals.push(match ind.market_trend {
        MarketTrend::Bull => Signal::bullish(
            SignalKind::Market,
            format!("bull market (strength {:.2})", ind.trend_strength),
        ),
        MarketTrend::Bear => Signal::bearish(
            SignalKind::Market,
            format!("bear market (strength {:.2})", ind.trend_strength),
        ),
        MarketTrend::Sideways => Signal::neutral(SignalKind::Market, "range-bound market"),
    });

    signals.push(if ind.volatility > 0.05 {
        Signal::bearish(SignalKind::Volatility, "high volatility")
    } else if ind.volatility < 0.02 {
        Signal::neutral(SignalKind::Volatility, "low volatility")
    } else {
        Signal::neutral(SignalKind::Volatility, "normal volatility")
    });

    signals.push(match ind.boll_breakout {
        BollBreakout::UpperBreakout => {
            Signal::bullish(SignalKind::Breakout, "upper band breakout")
        }
        BollBreakout::UpperTouch => Signal::bullish(SignalKind::Breakout, "upper band touch"),
        BollBreakout::LowerBreakout => {
            Signal::bearish(SignalKind::Breakout, "lower band breakout")
        }
        BollBreakout::LowerTouch => Signal::bearish(SignalKind::Breakout, "lower band touch"),
        BollBreakout::None => Signal::neutral(SignalKind::Breakout, "no breakout"),
    });

    let score = ind.momentum_score;
    signals.push(if score > 70.0 {
        Signal::bullish(SignalKind::Momentum, format!("strong ({:.0})", score))
    } else if score > 50.0 {
        Signal::bullish(SignalKind::Momentum, format!("firm ({:.0})", score))
    } else if score < 30.0 {
        Signal::bearish(SignalKind::Momentum, format!("weak ({:.0})", score))
    } else {
        Signal::neutral(SignalKind::Momentum, format!("neutral ({:.0})", score))
    });

    let strength = ind.sentiment_strength;
    signals.push(match ind.sentiment_type {
        // Contrarian: capitulation tends to mark a low
        SentimentType::Panic => Signal::bullish(
            SignalKind::Sentiment,
            format!("panic (strength {:.0})", strength),
        ),
        SentimentType::Frenzy => Signal::bearish(
            SignalKind::Sentiment,
            format!("frenzy (strength {:.0})", strength),
        ),
        SentimentType::Bullish => Signal::bullish(
            SignalKind::Sentiment,
            format!("optimistic (strength {:.0})", strength),
        ),
        SentimentType::Bearish => Signal::bearish(
            SignalKind::Sentiment,
            format!("pessimistic (strength {:.0})", strength),
        ),
        SentimentType::Neutral => Signal::neutral(SignalKind::Sentiment, "calm"),
    });

    let deviation = ind.cost_deviation_20;
    signals.push(if deviation > 20.0 {
        Signal::bearish(
            SignalKind::ChipCost,
            format!("heavy profit taking risk (+{:.1}%)", deviation),
        )
    } else if deviation > 10.0 {
        Signal::neutral(SignalKind::ChipCost, format!("holders in profit (+{:.1}%)", deviation))
    } else if deviation > 0.0 {
        Signal::bullish(
            SignalKind::ChipCost,
            format!("holders slightly in profit (+{:.1}%)", deviation),
        )
    } else if deviation > -10.0 {
        Signal::bullish(SignalKind::ChipCost, format!("near cost zone ({:.1}%)", deviation))
    } else {
        Signal::bullish(SignalKind::ChipCost, format!("holders trapped ({:.1}%)", deviation))
    });

    let concentration = ind.chip_concentration;
    signals.push(if concentration > 0.7 {
        Signal::bullish(
            SignalKind::ChipConcentration,
            format!("highly concentrated ({:.2})", concentration),
        )
    } else if concentration > 0.5 {
        Signal::neutral(
            SignalKind::ChipConcentration,
            format!("moderately concentrated ({:.2})", concentration),
        )
    } else {
        Signal::neutral(
            SignalKind::ChipConcentration,
            format!("dispersed ({:.2})", concentration),
        )
    });

    if let Some(index) = &ind.index {
        let change = index.index_change;
        signals.push(match index.index_trend {
            MarketTrend::Bull => {
                Signal::bullish(SignalKind::Index, format!("bull market ({:+.2}%)", change))
            }
            MarketTrend::Bear => {
                Signal::bearish(SignalKind::Index, format!("bear market ({:+.2}%)", change))
            }
            MarketTrend::Sideways if change > 1.0 => {
                Signal::bullish(SignalKind::Index, format!("range-bound, firm ({:+.2}%)", change))
            }
            MarketTrend::Sideways if change < -1.0 => {
                Signal::bearish(SignalKind::Index, format!("range-bound, soft ({:+.2}%)", change))
            }
            MarketTrend::Sideways => {
                Signal::neutral(SignalKind::Index, format!("range-bound ({:+.2}%)", change))
            }
        });

        let relative = index.relative_strength;
        signals.push(if relative > 2.0 {
            Signal::bullish(
                SignalKind::RelativeStrength,
                format!("outperforming index ({:+.2}%)", relative),
            )
        } else if relative < -2.0 {
            Signal::bearish(
                SignalKind::RelativeStrength,
                format!("underperforming index ({:+.2}%)", relative),
            )
        } else {
            Signal::neutral(
                SignalKind::RelativeStrength,
                format!("tracking index ({:+.2}%)", relative),
            )
        });

        let beta = index.beta;
        signals.push(if beta > 1.2 {
            Signal::neutral(SignalKind::Beta, format!("high beta ({:.2})", beta))
        } else if beta < 0.8 {
            Signal::neutral(SignalKind::Beta, format!("low beta ({:.2})", beta))
        } else {
            Signal::neutral(SignalKind::Beta, format!("tracks index ({:.2})", beta))
        });
    }

    signals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IndexMetrics, SignalType};

    fn neutral_indicators() -> Indicators {
        Indicators {
            current_price: 10.0,
            ma5: 10.0,
            ma20: 10.0,
            rsi: 50.0,
            rsi_upper_threshold: 70.0,
            rsi_lower_threshold: 30.0,
            kdj_j: 50.0,
            volume_ratio: 1.0,
            volatility: 0.03,
            momentum_score: 40.0,
            cost_deviation_20: 15.0,
            chip_concentration: 0.6,
            ..Indicators::default()
        }
    }

    fn find(signals: &[Signal], kind: SignalKind) -> &Signal {
        signals
            .iter()
            .find(|s| s.name == kind)
            .unwrap_or_else(|| panic!("missing {:?} signal", kind))
    }

    #[test]
    fn test_core_signal_order() {
        let signals = classify(&neutral_indicators());
        let kinds: Vec<SignalKind> = signals.iter().map(|s| s.name).collect();
        assert_eq!(
            kinds,
            vec![
                SignalKind::Macd,
                SignalKind::Rsi,
                SignalKind::Kdj,
                SignalKind::MovingAverage,
                SignalKind::Volume,
                SignalKind::PriceVolume,
                SignalKind::Market,
                SignalKind::Volatility,
                SignalKind::Breakout,
                SignalKind::Momentum,
                SignalKind::Sentiment,
                SignalKind::ChipCost,
                SignalKind::ChipConcentration,
            ]
        );
    }

    #[test]
    fn test_macd_tie_is_neutral() {
        let signals = classify(&neutral_indicators());
        assert_eq!(find(&signals, SignalKind::Macd).signal_type, SignalType::Neutral);

        let ind = Indicators {
            macd: -0.2,
            macd_signal: 0.1,
            ..neutral_indicators()
        };
        let macd = classify(&ind).into_iter().find(|s| s.name == SignalKind::Macd).unwrap();
        assert_eq!(macd.signal_type, SignalType::Bearish);
        assert_eq!(macd.description, "death cross");
    }

    #[test]
    fn test_rsi_uses_dynamic_thresholds() {
        let ind = Indicators {
            rsi: 75.0,
            rsi_upper_threshold: 80.0,
            ..neutral_indicators()
        };
        let signals = classify(&ind);
        assert_eq!(find(&signals, SignalKind::Rsi).signal_type, SignalType::Neutral);

        let ind = Indicators {
            rsi: 25.0,
            rsi_lower_threshold: 28.0,
            ..neutral_indicators()
        };
        let signals = classify(&ind);
        assert_eq!(find(&signals, SignalKind::Rsi).signal_type, SignalType::Bullish);
    }

    #[test]
    fn test_threshold_ties_are_neutral() {
        let ind = Indicators {
            kdj_j: 80.0,
            volume_ratio: 2.0,
            momentum_score: 70.0,
            ..neutral_indicators()
        };
        let signals = classify(&ind);
        assert_eq!(find(&signals, SignalKind::Kdj).signal_type, SignalType::Neutral);
        assert_eq!(find(&signals, SignalKind::Volume).signal_type, SignalType::Neutral);
        // 70 is not strong, but is above 50
        assert_eq!(find(&signals, SignalKind::Momentum).description, "firm (70)");
    }

    #[test]
    fn test_panic_is_contrarian_bullish() {
        let ind = Indicators {
            sentiment_type: SentimentType::Panic,
            sentiment_strength: 80.0,
            ..neutral_indicators()
        };
        let signals = classify(&ind);
        let sentiment = find(&signals, SignalKind::Sentiment);
        assert_eq!(sentiment.signal_type, SignalType::Bullish);
        assert_eq!(sentiment.description, "panic (strength 80)");
    }

    #[test]
    fn test_chip_cost_bands() {
        let cases = [
            (25.0, SignalType::Bearish),
            (15.0, SignalType::Neutral),
            (5.0, SignalType::Bullish),
            (-5.0, SignalType::Bullish),
            (-25.0, SignalType::Bullish),
        ];
        for (deviation, expected) in cases {
            let ind = Indicators {
                cost_deviation_20: deviation,
                ..neutral_indicators()
            };
            let signals = classify(&ind);
            assert_eq!(
                find(&signals, SignalKind::ChipCost).signal_type,
                expected,
                "deviation {}",
                deviation
            );
        }
    }

    #[test]
    fn test_index_signals_only_with_index() {
        assert_eq!(classify(&neutral_indicators()).len(), 13);

        let ind = Indicators {
            index: Some(IndexMetrics {
                index_code: "000001.SH".to_string(),
                index_change: 1.5,
                index_trend: MarketTrend::Sideways,
                relative_strength: -3.0,
                beta: 1.3,
                follow_index: true,
            }),
            ..neutral_indicators()
        };
        let signals = classify(&ind);
        assert_eq!(signals.len(), 16);
        assert_eq!(find(&signals, SignalKind::Index).signal_type, SignalType::Bullish);
        assert_eq!(
            find(&signals, SignalKind::RelativeStrength).signal_type,
            SignalType::Bearish
        );
        let beta = find(&signals, SignalKind::Beta);
        assert_eq!(beta.signal_type, SignalType::Neutral);
        assert_eq!(beta.description, "high beta (1.30)");
    }
}
