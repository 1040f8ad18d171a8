//! Numeric helpers shared by the indicator implementations.

/// Mean of the last `period` values; 0 if fewer than `period` exist.
pub fn sma(values: &[f64], period: usize) -> f64 {
    if period == 0 || values.len() < period {
        return 0.0;
    }
    values[values.len() - period..].iter().sum::<f64>() / period as f64
}

/// Mean over `min(period, len)` trailing values, so short series still get
/// an average of what is available.
pub fn adaptive_sma(values: &[f64], period: usize) -> f64 {
    sma(values, period.min(values.len()))
}

/// EMA series aligned with `values`.
///
/// Index `period - 1` holds the SMA seed; earlier slots are 0.
/// Returns `None` if fewer than `period` values exist.
pub fn ema_series(values: &[f64], period: usize) -> Option<Vec<f64>> {
    if period == 0 || values.len() < period {
        return None;
    }

    let multiplier = 2.0 / (period as f64 + 1.0);
    let mut ema = vec![0.0; values.len()];

    // First EMA is SMA
    ema[period - 1] = values[..period].iter().sum::<f64>() / period as f64;

    for i in period..values.len() {
        ema[i] = (values[i] - ema[i - 1]) * multiplier + ema[i - 1];
    }

    Some(ema)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Least-squares slope against the index, divided by the mean of the data.
///
/// Expresses the per-step trend as a fraction of the level. 0 for fewer
/// than two points or a zero mean.
pub fn normalized_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }

    let nf = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }

    let denominator = nf * sum_x2 - sum_x * sum_x;
    let avg_y = sum_y / nf;
    if denominator == 0.0 || avg_y == 0.0 {
        return 0.0;
    }

    let slope = (nf * sum_xy - sum_x * sum_y) / denominator;
    slope / avg_y
}

/// R² of a linear fit against the index (squared Pearson correlation).
pub fn r_squared(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }

    let nf = n as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2, mut sum_y2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
        sum_y2 += y * y;
    }

    let numerator = nf * sum_xy - sum_x * sum_y;
    let denom_x = nf * sum_x2 - sum_x * sum_x;
    let denom_y = nf * sum_y2 - sum_y * sum_y;
    if denom_x <= 0.0 || denom_y <= 0.0 {
        return 0.0;
    }

    let correlation = numerator / (denom_x * denom_y).sqrt();
    (correlation * correlation).min(1.0)
}

/// Percent change from `from` to `to`; 0 when `from` is 0.
pub fn pct_change(from: f64, to: f64) -> f64 {
    if from == 0.0 {
        return 0.0;
    }
    (to - from) / from * 100.0
}

pub fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

pub fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}
