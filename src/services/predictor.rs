use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::bars::{index_code_for, BarStore};
use super::narrative::{fallback_summary, NarrativeService, NewsItem, NewsSource};
use super::signals::{self, predictions};
use crate::error::{AppError, Result};
use crate::types::{Indicators, ModelPredictions, PredictResult, PriceRange, Signal};

const NEWS_LIMIT: usize = 15;
const DAILY_CHANGE_DAYS: usize = 10;
const DEFAULT_NARRATIVE_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the full analysis pipeline for one security.
pub struct Predictor {
    bar_store: Arc<dyn BarStore>,
    narrative: Option<Arc<dyn NarrativeService>>,
    news: Option<Arc<dyn NewsSource>>,
    narrative_timeout: Duration,
}

impl Predictor {
    pub fn new(bar_store: Arc<dyn BarStore>) -> Self {
        Self {
            bar_store,
            narrative: None,
            news: None,
            narrative_timeout: DEFAULT_NARRATIVE_TIMEOUT,
        }
    }

    /// Use a model-backed narrative, bounded by `timeout`.
    pub fn with_narrative(mut self, narrative: Arc<dyn NarrativeService>, timeout: Duration) -> Self {
        self.narrative = Some(narrative);
        self.narrative_timeout = timeout;
        self
    }

    pub fn with_news(mut self, news: Arc<dyn NewsSource>) -> Self {
        self.news = Some(news);
        self
    }

    /// Fetch bars and produce the complete forecast for `code`.
    ///
    /// Only a failed or empty bar fetch is an error. The index comparison,
    /// news and narrative are best effort.
    pub async fn predict(&self, code: &str, period: &str) -> Result<PredictResult> {
        let series = self
            .bar_store
            .get_bars(code, period)
            .await
            .map_err(|e| match e {
                AppError::ExternalApi(_) => e,
                other => AppError::ExternalApi(format!("bars for {}: {}", code, other)),
            })?;
        if series.is_empty() {
            return Err(AppError::ExternalApi(format!("no bars returned for {}", code)));
        }

        let name = if series.name.is_empty() {
            code.to_string()
        } else {
            series.name.clone()
        };

        let mut indicators = signals::compute(&series.bars)?;

        let index_code = index_code_for(code);
        match self.bar_store.get_bars(index_code, period).await {
            Ok(index) if !index.is_empty() => {
                signals::apply_index(&mut indicators, &series.bars, index_code, &index.bars);
            }
            Ok(_) => warn!("Index {} returned no bars, skipping comparison for {}", index_code, code),
            Err(e) => warn!("Index {} unavailable for {}: {}", index_code, code, e),
        }

        let signals = signals::classify(&indicators);
        let models = predictions::generate_model_predictions(&indicators);
        let (trend, confidence) = predictions::determine_trend(&models, &signals, &indicators);
        let target_prices = predictions::target_prices(indicators.current_price, trend, confidence);
        let daily_changes = predictions::daily_changes(&series.bars, DAILY_CHANGE_DAYS);

        let analysis = self.narrate(code, &name, &indicators, &models, &signals).await;

        debug!("{} forecast: {} ({:.2})", code, trend.name(), confidence);

        Ok(PredictResult {
            stock_code: code.to_string(),
            stock_name: name,
            current_price: indicators.current_price,
            trend,
            confidence,
            price_range: PriceRange {
                low: indicators.support_level,
                high: indicators.resistance_level,
            },
            target_prices,
            support_level: indicators.support_level,
            resistance_level: indicators.resistance_level,
            signals,
            model_predictions: models,
            analysis,
            daily_changes,
            indicators,
        })
    }

    async fn narrate(
        &self,
        code: &str,
        name: &str,
        indicators: &Indicators,
        models: &ModelPredictions,
        signals: &[Signal],
    ) -> String {
        let Some(ref narrative) = self.narrative else {
            return fallback_summary(code, name, indicators, models, signals);
        };

        let news = self.latest_news(code).await;

        let outcome = tokio::time::timeout(
            self.narrative_timeout,
            narrative.analyze(code, name, indicators, signals, &news),
        )
        .await
        .unwrap_or_else(|_| {
            Err(AppError::Narrative(format!(
                "timed out after {:?}",
                self.narrative_timeout
            )))
        });

        match outcome {
            Ok(text) => text,
            Err(e) => {
                if e.is_soft() {
                    warn!("Narrative for {} unavailable, using summary: {}", code, e);
                } else {
                    error!("Narrative for {} failed, using summary: {}", code, e);
                }
                fallback_summary(code, name, indicators, models, signals)
            }
        }
    }

    async fn latest_news(&self, code: &str) -> Vec<NewsItem> {
        let Some(ref source) = self.news else {
            return Vec::new();
        };
        match source.latest(code, NEWS_LIMIT).await {
            Ok(items) => items,
            Err(e) => {
                warn!("News for {} unavailable: {}", code, e);
                Vec::new()
            }
        }
    }
}
