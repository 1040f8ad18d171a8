//! Crowd sentiment metrics from the shape of recent bars.

use crate::types::{Bar, SentimentType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentiment {
    /// Range of the last bar relative to the previous close, in percent.
    pub amplitude: f64,
    pub avg_amplitude_5d: f64,
    pub upper_shadow_ratio: f64,
    pub lower_shadow_ratio: f64,
    /// Signed count of consecutive same-direction closes.
    pub continuous_days: i32,
    pub strength: f64,
    pub sentiment_type: SentimentType,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            amplitude: 0.0,
            avg_amplitude_5d: 0.0,
            upper_shadow_ratio: 0.0,
            lower_shadow_ratio: 0.0,
            continuous_days: 0,
            strength: 50.0,
            sentiment_type: SentimentType::Neutral,
        }
    }
}

pub fn analyze(bars: &[Bar], volume_ratio: f64) -> Sentiment {
    let Some(last) = bars.last() else {
        return Sentiment::default();
    };

    let (amplitude, avg_amplitude_5d) = amplitude(bars);
    let (upper_shadow_ratio, lower_shadow_ratio) = shadow_ratios(last);
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let continuous_days = continuous_days(&closes);

    let mut score: f64 = 0.0;

    if amplitude > avg_amplitude_5d * 2.0 {
        score += 30.0;
    } else if amplitude > avg_amplitude_5d * 1.5 {
        score += 20.0;
    } else if amplitude > avg_amplitude_5d {
        score += 10.0;
    }

    let streak = continuous_days.unsigned_abs();
    if streak >= 5 {
        score += 25.0;
    } else if streak >= 3 {
        score += 15.0;
    } else if streak >= 2 {
        score += 10.0;
    }

    let max_shadow = upper_shadow_ratio.max(lower_shadow_ratio);
    if max_shadow > 0.4 {
        score += 20.0;
    } else if max_shadow > 0.3 {
        score += 10.0;
    }

    if volume_ratio > 3.0 {
        score += 25.0;
    } else if volume_ratio > 2.0 {
        score += 15.0;
    } else if volume_ratio > 1.5 {
        score += 10.0;
    }

    let change = last.body_change_pct();
    let sentiment_type = if change < -5.0 && volume_ratio > 2.0 && lower_shadow_ratio > 0.3 {
        SentimentType::Panic
    } else if change > 7.0 && volume_ratio > 2.5 && amplitude > avg_amplitude_5d * 1.5 {
        SentimentType::Frenzy
    } else if continuous_days >= 3 || change > 3.0 {
        SentimentType::Bullish
    } else if continuous_days <= -3 || change < -3.0 {
        SentimentType::Bearish
    } else {
        SentimentType::Neutral
    };

    Sentiment {
        amplitude,
        avg_amplitude_5d,
        upper_shadow_ratio,
        lower_shadow_ratio,
        continuous_days,
        strength: score.min(100.0),
        sentiment_type,
    }
}

/// Current amplitude and its 5-bar average, both in percent of the prior close.
pub fn amplitude(bars: &[Bar]) -> (f64, f64) {
    let n = bars.len();
    let bar_amplitude = |i: usize| -> f64 {
        if i == 0 || bars[i - 1].close <= 0.0 {
            return 0.0;
        }
        (bars[i].high - bars[i].low) / bars[i - 1].close * 100.0
    };

    if n == 0 {
        return (0.0, 0.0);
    }

    let current = bar_amplitude(n - 1);
    let avg_5d = if n >= 5 {
        (n - 5..n).map(bar_amplitude).sum::<f64>() / 5.0
    } else {
        0.0
    };

    (current, avg_5d)
}

/// Upper and lower shadow as fractions of the bar's full range.
pub fn shadow_ratios(bar: &Bar) -> (f64, f64) {
    let range = bar.high - bar.low;
    if range <= 0.0 {
        return (0.0, 0.0);
    }
    let body_high = bar.open.max(bar.close);
    let body_low = bar.open.min(bar.close);
    ((bar.high - body_high) / range, (body_low - bar.low) / range)
}

/// Positive for an up streak, negative for a down streak, 0 if the last close was flat.
pub fn continuous_days(closes: &[f64]) -> i32 {
    if closes.len() < 2 {
        return 0;
    }

    let last_change = closes[closes.len() - 1] - closes[closes.len() - 2];
    if last_change == 0.0 {
        return 0;
    }
    let rising = last_change > 0.0;

    let streak = closes
        .windows(2)
        .rev()
        .take_while(|w| {
            let change = w[1] - w[0];
            if rising {
                change > 0.0
            } else {
                change < 0.0
            }
        })
        .count() as i32;

    if rising {
        streak
    } else {
        -streak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar {
            date: "2024-01-02".to_string(),
            open,
            high,
            low,
            close,
            volume: 1000.0,
            amount: 0.0,
        }
    }

    #[test]
    fn test_empty_is_neutral() {
        let s = analyze(&[], 1.0);
        assert_eq!(s.strength, 50.0);
        assert_eq!(s.sentiment_type, SentimentType::Neutral);
    }

    #[test]
    fn test_continuous_days() {
        assert_eq!(continuous_days(&[1.0, 2.0, 3.0, 4.0]), 3);
        assert_eq!(continuous_days(&[5.0, 6.0, 5.0, 4.0]), -2);
        assert_eq!(continuous_days(&[1.0, 2.0, 2.0]), 0);
        assert_eq!(continuous_days(&[1.0]), 0);
    }

    #[test]
    fn test_shadow_ratios() {
        let (upper, lower) = shadow_ratios(&bar(10.0, 12.0, 8.0, 11.0));
        assert!((upper - 0.25).abs() < 1e-12);
        assert!((lower - 0.5).abs() < 1e-12);
        assert_eq!(shadow_ratios(&bar(10.0, 10.0, 10.0, 10.0)), (0.0, 0.0));
    }

    #[test]
    fn test_amplitude() {
        let bars = vec![
            bar(10.0, 10.5, 9.5, 10.0),
            bar(10.0, 11.0, 10.0, 10.5),
        ];
        let (current, avg) = amplitude(&bars);
        assert!((current - 10.0).abs() < 1e-12);
        assert_eq!(avg, 0.0);
    }

    #[test]
    fn test_panic_sell_off() {
        let mut bars: Vec<Bar> = (0..5).map(|_| bar(10.0, 10.2, 9.8, 10.0)).collect();
        // Gap down session closing 8% lower with a long lower shadow
        bars.push(bar(10.0, 10.0, 8.0, 9.2));
        let s = analyze(&bars, 2.5);
        assert_eq!(s.sentiment_type, SentimentType::Panic);
        assert!(s.strength > 50.0);
    }

    #[test]
    fn test_frenzy_rally() {
        let mut bars: Vec<Bar> = (0..5).map(|_| bar(10.0, 10.1, 9.9, 10.0)).collect();
        bars.push(bar(10.0, 11.0, 10.0, 10.9));
        let s = analyze(&bars, 3.0);
        assert_eq!(s.sentiment_type, SentimentType::Frenzy);
    }

    #[test]
    fn test_streak_bullish() {
        let bars: Vec<Bar> = (0..6)
            .map(|i| {
                let c = 10.0 + i as f64 * 0.1;
                bar(c, c + 0.05, c - 0.05, c)
            })
            .collect();
        let s = analyze(&bars, 1.0);
        assert_eq!(s.continuous_days, 5);
        assert_eq!(s.sentiment_type, SentimentType::Bullish);
    }
}
