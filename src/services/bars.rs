//! Bar (kline) retrieval.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::cache::{CacheProvider, CacheProviderExt};
use crate::error::{AppError, Result};
use crate::types::{Bar, BarSeries, Period};

/// Source of OHLCV history for a security.
#[async_trait]
pub trait BarStore: Send + Sync {
    /// Bars for `code`, ascending by date.
    async fn get_bars(&self, code: &str, period: &str) -> Result<BarSeries>;
}

#[async_trait]
impl<S: BarStore + ?Sized> BarStore for Arc<S> {
    async fn get_bars(&self, code: &str, period: &str) -> Result<BarSeries> {
        (**self).get_bars(code, period).await
    }
}

/// Reference index for a stock code: ChiNext codes follow the ChiNext index,
/// everything else the Shanghai composite.
pub fn index_code_for(code: &str) -> &'static str {
    if code.starts_with("300") || code.starts_with("301") {
        "399006.SZ"
    } else {
        "000001.SH"
    }
}

/// Wire shape of the kline endpoint.
#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    period: String,
    #[serde(default, alias = "bars")]
    data: Vec<Bar>,
}

/// [`BarStore`] that fetches from an HTTP kline provider.
pub struct HttpBarStore {
    client: Client,
    base_url: String,
}

impl HttpBarStore {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl BarStore for HttpBarStore {
    async fn get_bars(&self, code: &str, period: &str) -> Result<BarSeries> {
        let url = format!("{}/stocks/{}/kline", self.base_url, code);
        debug!("Fetching bars for {} ({})", code, period);

        let response = self
            .client
            .get(&url)
            .query(&[("period", period)])
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("kline request for {} failed: {}", code, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "kline provider error {} for {}: {}",
                status, code, body
            )));
        }

        let payload: KlineResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("invalid kline payload for {}: {}", code, e)))?;

        Ok(BarSeries {
            code: if payload.code.is_empty() { code.to_string() } else { payload.code },
            name: payload.name,
            period: if payload.period.is_empty() { period.to_string() } else { payload.period },
            bars: normalize_bars(payload.data),
        })
    }
}

/// Cache lifetime for a period's bars.
pub fn cache_ttl(period: &str) -> Duration {
    match Period::from_str(period) {
        Some(Period::Weekly) | Some(Period::Monthly) => Duration::from_secs(30 * 60),
        _ => Duration::from_secs(5 * 60),
    }
}

fn cache_key(code: &str, period: &str) -> String {
    format!("kline:{}:{}", code, period)
}

/// Read-through cache in front of another [`BarStore`].
pub struct CachedBarStore<S> {
    inner: S,
    cache: Arc<dyn CacheProvider>,
}

impl<S: BarStore> CachedBarStore<S> {
    pub fn new(inner: S, cache: Arc<dyn CacheProvider>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: BarStore> BarStore for CachedBarStore<S> {
    async fn get_bars(&self, code: &str, period: &str) -> Result<BarSeries> {
        let key = cache_key(code, period);

        match self.cache.get_json::<BarSeries>(&key).await {
            Ok(Some(series)) if !series.is_empty() => {
                debug!("Cache hit for {}", key);
                return Ok(series);
            }
            Ok(_) => {}
            Err(e) => warn!("Cache read for {} failed: {}", key, e),
        }

        let series = self.inner.get_bars(code, period).await?;
        if !series.is_empty() {
            if let Err(e) = self.cache.set_json(&key, &series, cache_ttl(period)).await {
                warn!("Cache write for {} failed: {}", key, e);
            }
        }
        Ok(series)
    }
}

/// Reformat a provider date to `YYYY-MM-DD`; `None` for blank, unrecognized
/// or impossible calendar dates.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let date = if raw.len() == 8 {
        NaiveDate::parse_from_str(raw, "%Y%m%d").ok()?
    } else {
        // Leading date of "YYYY-MM-DD ..." or "YYYY/MM/DD ..."
        let head = raw.get(..10)?;
        NaiveDate::parse_from_str(head, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(head, "%Y/%m/%d"))
            .ok()?
    };
    Some(date.format("%Y-%m-%d").to_string())
}

/// Normalize dates, drop undated bars, sort ascending and keep the last bar
/// seen for each date.
pub fn normalize_bars(bars: Vec<Bar>) -> Vec<Bar> {
    let mut by_date: BTreeMap<String, Bar> = BTreeMap::new();
    for mut bar in bars {
        let Some(date) = normalize_date(&bar.date) else {
            continue;
        };
        bar.date = date.clone();
        by_date.insert(date, bar);
    }
    by_date.into_values().collect()
}
