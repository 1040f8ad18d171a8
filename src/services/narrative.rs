//! Prose analysis of a security's indicators.
//!
//! The model-backed [`HttpNarrativeService`] is optional; [`fallback_summary`]
//! produces a deterministic summary whenever it is missing or fails.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::{debug, info};

use crate::config::NarrativeConfig;
use crate::error::{AppError, Result};
use crate::types::{Indicators, ModelPredictions, Signal, SignalKind, SignalType, Trend};

/// A news headline or company announcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub source: String,
}

/// Turns computed indicators into analyst prose.
#[async_trait]
pub trait NarrativeService: Send + Sync {
    async fn analyze(
        &self,
        code: &str,
        name: &str,
        indicators: &Indicators,
        signals: &[Signal],
        news: &[NewsItem],
    ) -> Result<String>;
}

/// Supplies recent news for a security.
#[async_trait]
pub trait NewsSource: Send + Sync {
    async fn latest(&self, code: &str, limit: usize) -> Result<Vec<NewsItem>>;
}

const SYSTEM_PROMPT: &str = "You are a senior quantitative analyst with deep experience in \
the A-share market. Interpret the technical data you are given, confirm or question the key \
signals, and give concrete trading guidance with explicit risk notes.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ChatError>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatError {
    #[serde(default)]
    message: String,
}

/// [`NarrativeService`] backed by an OpenAI-compatible chat completions endpoint.
pub struct HttpNarrativeService {
    client: Client,
    base_url: String,
    auth_token: String,
    model: String,
}

impl HttpNarrativeService {
    pub fn new(config: &NarrativeConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            model: config.model.clone(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }
}

#[async_trait]
impl NarrativeService for HttpNarrativeService {
    async fn analyze(
        &self,
        code: &str,
        name: &str,
        indicators: &Indicators,
        signals: &[Signal],
        news: &[NewsItem],
    ) -> Result<String> {
        info!("Requesting narrative for {} from {} ({} news items)", code, self.model, news.len());

        let prompt = build_prompt(code, name, indicators, signals, news);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.auth_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Narrative(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Narrative(format!("model endpoint returned {}", response.status())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AppError::Narrative(format!("invalid response: {}", e)))?;

        if let Some(err) = body.error.filter(|e| !e.message.trim().is_empty()) {
            return Err(AppError::Narrative(err.message));
        }
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::Narrative("no choices returned".to_string()))?;
        if content.trim().is_empty() {
            return Err(AppError::Narrative("empty content".to_string()));
        }

        debug!("Narrative for {}: {} chars", code, content.len());
        Ok(content)
    }
}

fn join_signals(signals: &[Signal], kinds: &[SignalKind]) -> String {
    let parts: Vec<String> = signals
        .iter()
        .filter(|s| kinds.contains(&s.name))
        .map(|s| format!("{}: {}", s.name.name(), s.description))
        .collect();
    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

fn volatility_label(volatility: f64) -> &'static str {
    if volatility > 0.05 {
        "high"
    } else if volatility < 0.02 {
        "low"
    } else {
        "normal"
    }
}

/// User prompt describing the security's technical state.
pub fn build_prompt(
    code: &str,
    name: &str,
    ind: &Indicators,
    signals: &[Signal],
    news: &[NewsItem],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Analyse {} ({}).", name, code);
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Technicals:");
    let _ = writeln!(
        prompt,
        "- MA5={:.2}, MA10={:.2}, MA20={:.2}, MA60={:.2}",
        ind.ma5, ind.ma10, ind.ma20, ind.ma60
    );
    let _ = writeln!(
        prompt,
        "- MACD DIF={:.4}, DEA={:.4}, hist={:.4}",
        ind.macd, ind.macd_signal, ind.macd_hist
    );
    let _ = writeln!(
        prompt,
        "- RSI={:.2} (overbought>{:.1}, oversold<{:.1})",
        ind.rsi, ind.rsi_upper_threshold, ind.rsi_lower_threshold
    );
    let _ = writeln!(prompt, "- KDJ K={:.2}, D={:.2}, J={:.2}", ind.kdj_k, ind.kdj_d, ind.kdj_j);
    let _ = writeln!(
        prompt,
        "- Bollinger upper={:.2}, middle={:.2}, lower={:.2}",
        ind.boll_upper, ind.boll_middle, ind.boll_lower
    );
    let _ = writeln!(
        prompt,
        "- Volume ratio={:.2}, strength={:.2}; change 1d={:.2}%, 5d={:.2}%, 10d={:.2}%",
        ind.volume_ratio, ind.volume_strength, ind.change_1d, ind.change_5d, ind.change_10d
    );
    let _ = writeln!(
        prompt,
        "- Market {} (strength {:.2}), volatility {:.2}% ({})",
        ind.market_trend.name(),
        ind.trend_strength,
        ind.volatility * 100.0,
        volatility_label(ind.volatility)
    );
    let _ = writeln!(
        prompt,
        "- Support {:.2}, resistance {:.2}",
        ind.support_level, ind.resistance_level
    );
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Signals:");
    let _ = writeln!(
        prompt,
        "- Technical: {}",
        join_signals(
            signals,
            &[SignalKind::Macd, SignalKind::Rsi, SignalKind::Kdj, SignalKind::MovingAverage]
        )
    );
    let _ = writeln!(
        prompt,
        "- Volume: {}",
        join_signals(signals, &[SignalKind::Volume, SignalKind::PriceVolume])
    );
    let _ = writeln!(
        prompt,
        "- Market: {}",
        join_signals(signals, &[SignalKind::Market, SignalKind::Volatility, SignalKind::Index])
    );

    if !news.is_empty() {
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Recent news (weigh the likely price impact):");
        for (i, item) in news.iter().enumerate() {
            let _ = writeln!(prompt, "{}. [{}] {}", i + 1, item.time, item.title);
        }
    }

    let _ = writeln!(prompt);
    prompt.push_str(
        "Cover technical strength, volume confirmation, market backdrop, risk levels and an \
         actionable strategy. Use markdown and stay under 350 words.",
    );
    prompt
}

/// Rule-based summary used when no model narrative is available.
pub fn fallback_summary(
    code: &str,
    name: &str,
    ind: &Indicators,
    models: &ModelPredictions,
    signals: &[Signal],
) -> String {
    let mut bullish = signals.iter().filter(|s| s.signal_type == SignalType::Bullish).count();
    let mut bearish = signals.iter().filter(|s| s.signal_type == SignalType::Bearish).count();

    match models.moving_average.trend {
        Trend::Up => bullish += 1,
        Trend::Down => bearish += 1,
        Trend::Sideways => {}
    }

    let bias = if bullish > bearish {
        "leaning bullish"
    } else if bearish > bullish {
        "leaning bearish"
    } else {
        "range-bound"
    };

    let cross = if ind.macd > ind.macd_signal {
        "a golden cross"
    } else if ind.macd < ind.macd_signal {
        "a death cross"
    } else {
        "no cross"
    };

    let zone = if ind.rsi > 70.0 {
        "overbought"
    } else if ind.rsi < 30.0 {
        "oversold"
    } else {
        "normal"
    };

    format!(
        "Based on technical indicators and model forecasts, {} ({}) is currently {}. \
         MACD shows {}, and RSI at {:.1} is in the {} zone. \
         Weigh the broader market and your own risk tolerance before acting.",
        name, code, bias, cross, ind.rsi, zone
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ModelPrediction;

    fn models(trend: Trend) -> ModelPredictions {
        let p = ModelPrediction {
            trend,
            price: 10.0,
            confidence: 0.5,
        };
        ModelPredictions {
            moving_average: p,
            macd: p,
            rsi: p,
        }
    }

    #[test]
    fn test_fallback_bullish() {
        let ind = Indicators {
            macd: 0.3,
            macd_signal: 0.1,
            rsi: 75.0,
            ..Default::default()
        };
        let signals = vec![
            Signal::bullish(SignalKind::Macd, "golden cross"),
            Signal::neutral(SignalKind::Kdj, "neutral"),
        ];
        let text = fallback_summary("600519", "Moutai", &ind, &models(Trend::Sideways), &signals);
        assert!(text.contains("Moutai (600519)"));
        assert!(text.contains("leaning bullish"));
        assert!(text.contains("golden cross"));
        assert!(text.contains("RSI at 75.0"));
        assert!(text.contains("overbought"));
    }

    #[test]
    fn test_fallback_tie_counts_model_vote() {
        let ind = Indicators {
            rsi: 25.0,
            ..Default::default()
        };
        let signals = vec![Signal::bullish(SignalKind::Macd, "golden cross")];
        let text = fallback_summary("000001", "Ping An", &ind, &models(Trend::Down), &signals);
        assert!(text.contains("range-bound"));
        assert!(text.contains("MACD shows no cross"));
        assert!(text.contains("oversold"));
    }

    #[test]
    fn test_prompt_includes_news_and_signals() {
        let ind = Indicators::default();
        let signals = vec![Signal::bearish(SignalKind::Volume, "volume shrinking")];
        let news = vec![NewsItem {
            title: "Quarterly report".to_string(),
            time: "2024-04-30".to_string(),
            source: "exchange".to_string(),
        }];
        let prompt = build_prompt("600000", "Pudong Bank", &ind, &signals, &news);
        assert!(prompt.contains("Pudong Bank (600000)"));
        assert!(prompt.contains("Volume: volume shrinking"));
        assert!(prompt.contains("1. [2024-04-30] Quarterly report"));
        assert!(prompt.contains("- Technical: none"));
    }
}
