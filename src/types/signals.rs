use serde::{Deserialize, Serialize};

/// Direction a signal points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    Bullish,
    Bearish,
    Neutral,
}

impl SignalType {
    pub fn is_bullish(&self) -> bool {
        matches!(self, Self::Bullish)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, Self::Bearish)
    }
}

/// Indicator family a signal was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Macd,
    Rsi,
    Kdj,
    MovingAverage,
    Volume,
    PriceVolume,
    Market,
    Volatility,
    Breakout,
    Momentum,
    Sentiment,
    ChipCost,
    ChipConcentration,
    Index,
    RelativeStrength,
    Beta,
}

impl SignalKind {
    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Macd => "MACD",
            Self::Rsi => "RSI",
            Self::Kdj => "KDJ",
            Self::MovingAverage => "Moving Average",
            Self::Volume => "Volume",
            Self::PriceVolume => "Price/Volume",
            Self::Market => "Market",
            Self::Volatility => "Volatility",
            Self::Breakout => "Breakout",
            Self::Momentum => "Momentum",
            Self::Sentiment => "Sentiment",
            Self::ChipCost => "Chip Cost",
            Self::ChipConcentration => "Chip Concentration",
            Self::Index => "Index",
            Self::RelativeStrength => "Relative Strength",
            Self::Beta => "Beta",
        }
    }
}

/// A discrete, human-readable interpretation of one indicator family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub name: SignalKind,
    pub signal_type: SignalType,
    pub description: String,
}

impl Signal {
    pub fn new(name: SignalKind, signal_type: SignalType, description: impl Into<String>) -> Self {
        Self {
            name,
            signal_type,
            description: description.into(),
        }
    }

    pub fn bullish(name: SignalKind, description: impl Into<String>) -> Self {
        Self::new(name, SignalType::Bullish, description)
    }

    pub fn bearish(name: SignalKind, description: impl Into<String>) -> Self {
        Self::new(name, SignalType::Bearish, description)
    }

    pub fn neutral(name: SignalKind, description: impl Into<String>) -> Self {
        Self::new(name, SignalType::Neutral, description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_serialization() {
        let signal = Signal::bullish(SignalKind::Macd, "golden cross");
        let json = serde_json::to_value(&signal).unwrap();
        assert_eq!(json["name"], "macd");
        assert_eq!(json["signal_type"], "bullish");
        assert_eq!(json["description"], "golden cross");
    }

    #[test]
    fn test_signal_kind_names() {
        assert_eq!(SignalKind::MovingAverage.name(), "Moving Average");
        assert_eq!(SignalKind::ChipCost.name(), "Chip Cost");
    }
}
