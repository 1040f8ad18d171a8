use std::env;
use std::time::Duration;

/// Narrative (LLM) service configuration.
#[derive(Debug, Clone)]
pub struct NarrativeConfig {
    /// Base URL of an OpenAI-compatible endpoint.
    pub base_url: String,
    /// Bearer token.
    pub auth_token: String,
    /// Model name sent with each request.
    pub model: String,
    /// Upper bound for a single narrative call.
    pub timeout: Duration,
}

/// Task orchestrator configuration.
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Maximum number of tasks running at once.
    pub concurrency: usize,
    /// How long a task (and its idempotency key) is kept after creation.
    pub ttl: Duration,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the bar (kline) provider.
    pub bar_source_url: String,
    /// Optional Redis URL; the in-memory cache is used when absent.
    pub redis_url: Option<String>,
    /// Narrative service; `None` disables it and the rule-based summary is used.
    pub narrative: Option<NarrativeConfig>,
    /// Orchestrator limits.
    pub tasks: TaskConfig,
    /// Timeout for bar fetches.
    pub fetch_timeout: Duration,
    /// Poll interval used by the CLI client.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bar_source_url: "http://localhost:8000/api".to_string(),
            redis_url: None,
            narrative: None,
            tasks: TaskConfig::default(),
            fetch_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let narrative_timeout = Duration::from_secs(parse_env("NARRATIVE_TIMEOUT_SECS", 30));

        // Both the endpoint and a token are needed to talk to the model
        let narrative = match (non_empty_env("LLM_BASE_URL"), non_empty_env("LLM_AUTH_TOKEN")) {
            (Some(base_url), Some(auth_token)) => Some(NarrativeConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                auth_token,
                model: non_empty_env("LLM_MODEL").unwrap_or_else(|| "qwen-plus".to_string()),
                timeout: narrative_timeout,
            }),
            _ => None,
        };

        let concurrency: usize = parse_env("TASK_CONCURRENCY", defaults.tasks.concurrency);

        Self {
            bar_source_url: non_empty_env("BAR_SOURCE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.bar_source_url),
            redis_url: non_empty_env("REDIS_URL"),
            narrative,
            tasks: TaskConfig {
                concurrency: concurrency.max(1),
                ttl: Duration::from_secs(parse_env(
                    "TASK_TTL_SECS",
                    defaults.tasks.ttl.as_secs(),
                )),
            },
            fetch_timeout: Duration::from_secs(parse_env(
                "FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout.as_secs(),
            )),
            poll_interval: Duration::from_millis(parse_env("POLL_INTERVAL_MS", 1000)),
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_task_config() {
        let config = TaskConfig::default();
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.ttl, Duration::from_secs(1800));
    }

    #[test]
    fn test_parse_env_falls_back_on_garbage() {
        env::set_var("STOCKCAST_TEST_GARBAGE", "not-a-number");
        let value: u64 = parse_env("STOCKCAST_TEST_GARBAGE", 42);
        assert_eq!(value, 42);
        env::remove_var("STOCKCAST_TEST_GARBAGE");
    }

    #[test]
    fn test_non_empty_env_treats_blank_as_missing() {
        env::set_var("STOCKCAST_TEST_BLANK", "   ");
        assert!(non_empty_env("STOCKCAST_TEST_BLANK").is_none());
        env::remove_var("STOCKCAST_TEST_BLANK");
    }
}
