use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use stockcast::config::Config;
use stockcast::services::{
    BarStore, CacheProvider, CachedBarStore, HttpBarStore, HttpNarrativeService,
    MemoryCacheProvider, Predictor, RedisCacheProvider, TaskOrchestrator,
};
use stockcast::types::{TaskSnapshot, TaskStatus};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Run a batch of stock predictions and print the final task as JSON.
#[derive(Parser, Debug)]
#[command(name = "stockcast", about = "Technical indicator forecasts for a batch of stocks")]
struct Args {
    /// Bar period (daily, weekly, monthly).
    period: String,

    /// Stock codes to predict, processed in order.
    #[arg(required = true)]
    codes: Vec<String>,

    /// Idempotency key; an open task with the same key is reused.
    #[arg(long)]
    key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stockcast=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = Config::from_env();
    info!("Using bar source {}", config.bar_source_url);

    let cache: Arc<dyn CacheProvider> = match config.redis_url {
        Some(ref url) => Arc::new(RedisCacheProvider::new(url).await),
        None => Arc::new(MemoryCacheProvider::new()),
    };

    let http = HttpBarStore::new(&config.bar_source_url, config.fetch_timeout)?;
    let bar_store: Arc<dyn BarStore> = Arc::new(CachedBarStore::new(http, cache));

    let mut predictor = Predictor::new(bar_store);
    match config.narrative {
        Some(ref narrative) => {
            info!("Narrative enabled with model {}", narrative.model);
            let service = HttpNarrativeService::new(narrative)?;
            predictor = predictor.with_narrative(Arc::new(service), narrative.timeout);
        }
        None => warn!("LLM_BASE_URL or LLM_AUTH_TOKEN not set, using rule-based summaries"),
    }

    let orchestrator = TaskOrchestrator::new(Arc::new(predictor), config.tasks.clone());
    let created = orchestrator.create_task(&args.codes, &args.period, args.key.as_deref())?;
    let task_id = created.snapshot.task_id.clone();
    if !created.created {
        info!("Reusing task {}", task_id);
    }

    let snapshot = poll(&orchestrator, &task_id, config.poll_interval).await?;
    orchestrator.shutdown();

    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    Ok(match snapshot.status {
        TaskStatus::Done => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn poll(
    orchestrator: &TaskOrchestrator,
    task_id: &str,
    interval: std::time::Duration,
) -> anyhow::Result<TaskSnapshot> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        let snapshot = orchestrator.get_task_status(task_id)?;
        if snapshot.status.is_terminal() {
            return Ok(snapshot);
        }
        debug!(
            "Task {} {} ({}/{})",
            task_id,
            snapshot.status.name(),
            snapshot.done,
            snapshot.total
        );

        tokio::select! {
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    continue;
                }
                info!("Interrupted, canceling task {}", task_id);
                return Ok(orchestrator.cancel_task(task_id)?);
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("stockcast").chain(list.iter().copied()))
    }

    #[test]
    fn test_parse_args() {
        let parsed = args(&["daily", "600000", "--key", "abc", "000001"]).unwrap();
        assert_eq!(parsed.period, "daily");
        assert_eq!(parsed.codes, vec!["600000", "000001"]);
        assert_eq!(parsed.key.as_deref(), Some("abc"));
    }

    #[test]
    fn test_parse_args_requires_codes() {
        assert!(args(&["daily"]).is_err());
        assert!(args(&[]).is_err());
        assert!(args(&["daily", "600000", "--key"]).is_err());
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        let err = args(&["daily", "--kye", "abc", "600000"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }
}
