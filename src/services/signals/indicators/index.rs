//! Metrics relative to a reference market index.

use crate::types::{Bar, IndexMetrics, MarketTrend};

use super::stats::{pct_change, sma};

const BETA_WINDOW: usize = 20;
const BETA_MIN_WINDOW: usize = 10;

/// Compare a stock's bars with a parallel index series.
pub fn index_metrics(index_code: &str, stock: &[Bar], index: &[Bar]) -> IndexMetrics {
    let index_change = last_change(index);

    let index_trend = if index.len() >= 20 {
        let closes: Vec<f64> = index.iter().map(|b| b.close).collect();
        let ma5 = sma(&closes, 5);
        let ma20 = sma(&closes, 20);
        if ma5 > ma20 * 1.02 {
            MarketTrend::Bull
        } else if ma5 < ma20 * 0.98 {
            MarketTrend::Bear
        } else {
            MarketTrend::Sideways
        }
    } else {
        MarketTrend::Sideways
    };

    let relative_strength = if stock.len() >= 2 && index_change != 0.0 {
        last_change(stock) - index_change
    } else {
        0.0
    };

    let beta = beta(stock, index);

    IndexMetrics {
        index_code: index_code.to_string(),
        index_change,
        index_trend,
        relative_strength,
        beta,
        follow_index: beta > 0.8,
    }
}

fn last_change(bars: &[Bar]) -> f64 {
    match bars {
        [.., prev, last] => pct_change(prev.close, last.close),
        _ => 0.0,
    }
}

/// Covariance of daily returns over index variance for the trailing window.
///
/// 1.0 when fewer than 10 aligned bars exist or the index did not move.
pub fn beta(stock: &[Bar], index: &[Bar]) -> f64 {
    let window = BETA_WINDOW.min(stock.len()).min(index.len());
    if window < BETA_MIN_WINDOW {
        return 1.0;
    }

    let returns = |bars: &[Bar]| -> Vec<f64> {
        bars[bars.len() - window..]
            .windows(2)
            .map(|w| {
                if w[0].close > 0.0 {
                    (w[1].close - w[0].close) / w[0].close
                } else {
                    0.0
                }
            })
            .collect()
    };

    let stock_returns = returns(stock);
    let index_returns = returns(index);
    let n = stock_returns.len() as f64;

    let stock_mean = stock_returns.iter().sum::<f64>() / n;
    let index_mean = index_returns.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (s, i) in stock_returns.iter().zip(&index_returns) {
        covariance += (s - stock_mean) * (i - index_mean);
        variance += (i - index_mean).powi(2);
    }

    if variance == 0.0 {
        return 1.0;
    }
    covariance / variance
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar {
                date: format!("2024-02-{:02}", i + 1),
                open: c,
                high: c,
                low: c,
                close: c,
                volume: 1.0,
                amount: 0.0,
            })
            .collect()
    }

    fn zigzag(count: usize, amplitude: f64) -> Vec<f64> {
        (0..count)
            .map(|i| 100.0 * (1.0 + if i % 2 == 0 { amplitude } else { -amplitude }))
            .collect()
    }

    #[test]
    fn test_beta_defaults_to_one() {
        let short = series(&[1.0; 5]);
        assert_eq!(beta(&short, &short), 1.0);

        let flat = series(&[100.0; 25]);
        let moving = series(&zigzag(25, 0.01));
        assert_eq!(beta(&moving, &flat), 1.0);
    }

    #[test]
    fn test_beta_amplified_stock() {
        let index = series(&zigzag(25, 0.01));
        let stock = series(&zigzag(25, 0.02));
        let b = beta(&stock, &index);
        assert!(b > 1.5, "expected an amplified beta, got {}", b);
    }

    #[test]
    fn test_index_metrics() {
        let mut index_closes: Vec<f64> = (0..25).map(|i| 3000.0 + i as f64 * 20.0).collect();
        index_closes.push(index_closes[24] * 1.01);
        let index = series(&index_closes);
        let stock_closes: Vec<f64> = (0..26).map(|i| 10.0 + i as f64 * 0.1).collect();
        let stock = series(&stock_closes);

        let metrics = index_metrics("000001.SH", &stock, &index);
        assert_eq!(metrics.index_code, "000001.SH");
        assert!((metrics.index_change - 1.0).abs() < 1e-9);
        assert_eq!(metrics.index_trend, MarketTrend::Bull);
        let stock_change = (12.5 - 12.4) / 12.4 * 100.0;
        assert!((metrics.relative_strength - (stock_change - 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_index_metrics_short_index() {
        let index = series(&[3000.0]);
        let stock = series(&[10.0, 10.5]);
        let metrics = index_metrics("399006.SZ", &stock, &index);
        assert_eq!(metrics.index_change, 0.0);
        assert_eq!(metrics.relative_strength, 0.0);
        assert_eq!(metrics.index_trend, MarketTrend::Sideways);
        assert_eq!(metrics.beta, 1.0);
        assert!(metrics.follow_index);
    }
}
