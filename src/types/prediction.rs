use serde::{Deserialize, Serialize};

use super::{Indicators, Signal};

/// Overall direction of a forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Sideways,
}

impl Trend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "bullish",
            Self::Down => "bearish",
            Self::Sideways => "range-bound",
        }
    }
}

/// Output of one rule-based trend model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPrediction {
    pub trend: Trend,
    pub price: f64,
    pub confidence: f64,
}

/// The three rule-based trend models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictions {
    /// Moving-average alignment plus momentum.
    pub moving_average: ModelPrediction,
    /// MACD cross and histogram size.
    pub macd: ModelPrediction,
    /// RSI zone plus short-term momentum.
    pub rsi: ModelPrediction,
}

impl ModelPredictions {
    pub fn iter(&self) -> impl Iterator<Item = &ModelPrediction> {
        [&self.moving_average, &self.macd, &self.rsi].into_iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetPrices {
    pub short: f64,
    pub medium: f64,
    pub long: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub low: f64,
    pub high: f64,
}

/// Close-to-close change for one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyChange {
    pub date: String,
    /// Percent change from the previous close.
    pub change: f64,
    pub close: f64,
}

/// Per-security result produced by a prediction task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictResult {
    pub stock_code: String,
    pub stock_name: String,
    pub current_price: f64,
    pub trend: Trend,
    pub confidence: f64,
    pub price_range: PriceRange,
    pub target_prices: TargetPrices,
    pub support_level: f64,
    pub resistance_level: f64,
    pub indicators: Indicators,
    pub signals: Vec<Signal>,
    pub model_predictions: ModelPredictions,
    pub analysis: String,
    pub daily_changes: Vec<DailyChange>,
}
