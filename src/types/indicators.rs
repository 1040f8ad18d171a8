use serde::{Deserialize, Serialize};

/// Market regime derived from the trailing trend fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MarketTrend {
    Bull,
    Bear,
    #[default]
    Sideways,
}

impl MarketTrend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bull => "bull market",
            Self::Bear => "bear market",
            Self::Sideways => "range-bound market",
        }
    }
}

/// Relationship between the recent price slope and volume slope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceVolumeDivergence {
    /// Price rising on falling volume.
    BearishDivergence,
    /// Price falling on rising volume.
    BullishDivergence,
    HealthyUptrend,
    HealthyDowntrend,
    #[default]
    Neutral,
}

/// Position of the last close relative to the Bollinger bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BollBreakout {
    /// Two consecutive closes above the upper band.
    UpperBreakout,
    UpperTouch,
    /// Two consecutive closes below the lower band.
    LowerBreakout,
    LowerTouch,
    #[default]
    None,
}

/// Crowd sentiment classification of the last bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SentimentType {
    Panic,
    Frenzy,
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// Metrics relative to a reference index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetrics {
    pub index_code: String,
    /// Last index change in percent.
    pub index_change: f64,
    pub index_trend: MarketTrend,
    /// Stock 1-day change minus index change, in percentage points.
    pub relative_strength: f64,
    pub beta: f64,
    pub follow_index: bool,
}

/// Point-in-time analytics bundle for one security.
///
/// Computed from scratch for every request; the last bar is "now".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Indicators {
    pub current_price: f64,

    // Moving averages
    pub ma5: f64,
    pub ma10: f64,
    pub ma20: f64,
    pub ma60: f64,

    // Trend
    pub macd: f64,
    pub macd_signal: f64,
    pub macd_hist: f64,

    // Oscillators
    pub rsi: f64,
    pub kdj_k: f64,
    pub kdj_d: f64,
    pub kdj_j: f64,

    // Bands and levels
    pub boll_upper: f64,
    pub boll_middle: f64,
    pub boll_lower: f64,
    pub support_level: f64,
    pub resistance_level: f64,

    // Momentum
    pub change_1d: f64,
    pub change_5d: f64,
    pub change_10d: f64,
    pub ma5_slope: f64,

    // Volume
    pub current_volume: f64,
    pub volume_ma5: f64,
    pub volume_ma10: f64,
    pub volume_ratio: f64,
    pub price_volume_divergence: PriceVolumeDivergence,
    pub volume_strength: f64,

    // Adaptive thresholds and regime
    pub rsi_upper_threshold: f64,
    pub rsi_lower_threshold: f64,
    pub market_trend: MarketTrend,
    pub volatility: f64,
    pub trend_strength: f64,

    // Breakouts
    pub boll_breakout: BollBreakout,
    pub volume_breakout: bool,
    pub price_acceleration: f64,
    pub momentum_score: f64,

    // Sentiment
    pub amplitude: f64,
    pub avg_amplitude_5d: f64,
    pub upper_shadow_ratio: f64,
    pub lower_shadow_ratio: f64,
    pub continuous_days: i32,
    pub sentiment_strength: f64,
    pub sentiment_type: SentimentType,

    // Chip cost
    pub main_force_cost_20: f64,
    pub main_force_cost_60: f64,
    pub cost_deviation_20: f64,
    pub cost_deviation_60: f64,
    pub chip_concentration: f64,
    pub main_force_profit: f64,

    /// Present only when a reference index series was supplied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<IndexMetrics>,
}
