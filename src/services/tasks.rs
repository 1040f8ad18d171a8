//! Background prediction tasks.
//!
//! A task runs the [`Predictor`] over a list of codes, one code at a time.
//! At most `concurrency` tasks run at once; the rest wait for a semaphore
//! permit in `pending`. Clients poll [`TaskOrchestrator::get_task_status`]
//! until the task reaches a terminal state.
//!
//! All task and idempotency bookkeeping sits behind one mutex that is never
//! held across an `.await`.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::predictor::Predictor;
use crate::config::TaskConfig;
use crate::error::{AppError, Result};
use crate::types::{CreateTaskResponse, PredictResult, TaskSnapshot, TaskStatus};

const CANCELED_MESSAGE: &str = "task canceled";

struct TaskRecord {
    id: String,
    status: TaskStatus,
    canceled: bool,
    codes: Vec<String>,
    period: String,
    current_code: Option<String>,
    done: usize,
    results: Vec<PredictResult>,
    error: Option<String>,
    idempotency_key: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TaskRecord {
    fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            task_id: self.id.clone(),
            status: self.status,
            current_code: self.current_code.clone(),
            done: self.done,
            total: self.codes.len(),
            results: self.status.is_terminal().then(|| self.results.clone()),
            error: self.error.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }

    /// Whether the worker should stop touching this task.
    fn is_stopped(&self) -> bool {
        self.canceled || self.status.is_terminal()
    }
}

struct IdempotencyEntry {
    task_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct TaskState {
    tasks: HashMap<String, TaskRecord>,
    keys: HashMap<String, IdempotencyEntry>,
}

impl TaskState {
    fn sweep(&mut self, now: DateTime<Utc>) {
        self.tasks.retain(|_, t| t.expires_at > now);
        let tasks = &self.tasks;
        self.keys
            .retain(|_, e| e.expires_at > now && tasks.contains_key(&e.task_id));
    }

    /// Drop `key` if it still points at `task_id`.
    fn release_key(&mut self, key: Option<&str>, task_id: &str) {
        let Some(key) = key else {
            return;
        };
        if self.keys.get(key).map_or(false, |e| e.task_id == task_id) {
            self.keys.remove(key);
        }
    }

    fn cancel(&mut self, task_id: &str) -> Option<TaskSnapshot> {
        let task = self.tasks.get_mut(task_id)?;
        if !task.status.is_terminal() {
            task.canceled = true;
            task.status = TaskStatus::Canceled;
            task.error = Some(CANCELED_MESSAGE.to_string());
            task.current_code = None;
            let key = task.idempotency_key.clone();
            let snapshot = task.snapshot();
            self.release_key(key.as_deref(), task_id);
            return Some(snapshot);
        }
        Some(task.snapshot())
    }
}

/// Owns the lifecycle of prediction tasks.
pub struct TaskOrchestrator {
    predictor: Arc<Predictor>,
    config: TaskConfig,
    semaphore: Arc<Semaphore>,
    state: Mutex<TaskState>,
}

impl TaskOrchestrator {
    pub fn new(predictor: Arc<Predictor>, config: TaskConfig) -> Arc<Self> {
        let permits = config.concurrency.max(1);
        Arc::new(Self {
            predictor,
            semaphore: Arc::new(Semaphore::new(permits)),
            config,
            state: Mutex::new(TaskState::default()),
        })
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.config.ttl).unwrap_or_else(|_| chrono::Duration::days(1))
    }

    /// Register a task for `codes` and start it in the background.
    ///
    /// Returns immediately. A non-empty `idempotency_key` that is still bound
    /// to a live task returns that task instead, with `created = false`.
    /// Must be called from within a tokio runtime.
    pub fn create_task<I, S>(
        self: &Arc<Self>,
        codes: I,
        period: &str,
        idempotency_key: Option<&str>,
    ) -> Result<CreateTaskResponse>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let codes: Vec<String> = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if codes.is_empty() {
            return Err(AppError::BadRequest("codes must not be empty".to_string()));
        }

        let period = match period.trim() {
            "" => "daily".to_string(),
            p => p.to_string(),
        };
        let key = idempotency_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        let now = Utc::now();
        let (id, snapshot) = {
            let mut state = self.lock();
            state.sweep(now);

            if let Some(ref key) = key {
                let existing = state
                    .keys
                    .get(key)
                    .and_then(|e| state.tasks.get(&e.task_id))
                    .map(TaskRecord::snapshot);
                if let Some(snapshot) = existing {
                    debug!("Idempotency key {} matched task {}", key, snapshot.task_id);
                    return Ok(CreateTaskResponse {
                        snapshot,
                        created: false,
                    });
                }
            }

            let id = Uuid::new_v4().to_string();
            let expires_at = now + self.ttl();
            let record = TaskRecord {
                id: id.clone(),
                status: TaskStatus::Pending,
                canceled: false,
                codes,
                period,
                current_code: None,
                done: 0,
                results: Vec::new(),
                error: None,
                idempotency_key: key.clone(),
                created_at: now,
                expires_at,
            };
            let snapshot = record.snapshot();
            state.tasks.insert(id.clone(), record);
            if let Some(key) = key {
                state.keys.insert(
                    key,
                    IdempotencyEntry {
                        task_id: id.clone(),
                        expires_at,
                    },
                );
            }
            info!("Created task {} for {} codes", id, snapshot.total);
            (id, snapshot)
        };

        tokio::spawn(Arc::clone(self).run(id));

        Ok(CreateTaskResponse {
            snapshot,
            created: true,
        })
    }

    /// Current state of a task. Expired tasks are gone.
    pub fn get_task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        let mut state = self.lock();
        state.sweep(Utc::now());
        state
            .tasks
            .get(task_id)
            .map(TaskRecord::snapshot)
            .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))
    }

    /// Cancel a task. Terminal tasks are returned unchanged.
    pub fn cancel_task(&self, task_id: &str) -> Result<TaskSnapshot> {
        let mut state = self.lock();
        state.sweep(Utc::now());
        let snapshot = state
            .cancel(task_id)
            .ok_or_else(|| AppError::NotFound(format!("task {}", task_id)))?;
        if snapshot.status == TaskStatus::Canceled {
            info!("Task {} canceled", task_id);
        }
        Ok(snapshot)
    }

    /// Cancel every unfinished task and stop accepting work.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        let open: Vec<String> = state
            .tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .map(|t| t.id.clone())
            .collect();
        for id in &open {
            state.cancel(id);
        }
        drop(state);
        self.semaphore.close();
        info!("Task orchestrator shut down, {} tasks canceled", open.len());
    }

    /// Number of tasks not yet in a terminal state.
    pub fn active_count(&self) -> usize {
        self.lock()
            .tasks
            .values()
            .filter(|t| !t.status.is_terminal())
            .count()
    }

    /// Number of tasks retained, including finished ones.
    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn run(self: Arc<Self>, task_id: String) {
        let Ok(_permit) = self.semaphore.clone().acquire_owned().await else {
            debug!("Task {} dropped, orchestrator closed", task_id);
            return;
        };

        let (codes, period) = {
            let mut state = self.lock();
            let Some(task) = state.tasks.get_mut(&task_id) else {
                return;
            };
            if task.canceled || task.status != TaskStatus::Pending {
                return;
            }
            task.status = TaskStatus::Running;
            (task.codes.clone(), task.period.clone())
        };
        info!("Task {} running ({} codes, {})", task_id, codes.len(), period);

        for (i, code) in codes.iter().enumerate() {
            {
                let mut state = self.lock();
                let Some(task) = state.tasks.get_mut(&task_id) else {
                    return;
                };
                if task.is_stopped() {
                    return;
                }
                task.current_code = Some(code.clone());
            }

            debug!("Task {} processing {} ({}/{})", task_id, code, i + 1, codes.len());
            let outcome = self.predictor.predict(code, &period).await;

            let mut state = self.lock();
            let Some(task) = state.tasks.get_mut(&task_id) else {
                return;
            };
            if task.is_stopped() {
                // Work already in flight is kept on a canceled task
                if let (true, Ok(result)) = (task.canceled, outcome) {
                    debug!("Task {} canceled, keeping result for {}", task_id, code);
                    task.results.push(result);
                    task.done = i + 1;
                }
                return;
            }
            match outcome {
                Ok(result) => {
                    task.results.push(result);
                    task.done = i + 1;
                }
                Err(e) => {
                    error!("Task {} failed on {}: {}", task_id, code, e);
                    task.status = TaskStatus::Failed;
                    task.error = Some(e.to_string());
                    task.done = i;
                    return;
                }
            }
        }

        let mut state = self.lock();
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return;
        };
        if task.is_stopped() {
            return;
        }
        task.status = TaskStatus::Done;
        task.current_code = None;
        let key = task.idempotency_key.clone();
        state.release_key(key.as_deref(), &task_id);
        info!("Task {} done", task_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::bars::BarStore;
    use crate::types::{Bar, BarSeries};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FlatStore;

    #[async_trait]
    impl BarStore for FlatStore {
        async fn get_bars(&self, code: &str, _period: &str) -> Result<BarSeries> {
            let bars = (1..=25)
                .map(|d| Bar {
                    date: format!("2024-05-{:02}", d),
                    open: 10.0,
                    high: 10.2,
                    low: 9.8,
                    close: 10.0,
                    volume: 500.0,
                    amount: 0.0,
                })
                .collect();
            Ok(BarSeries {
                code: code.to_string(),
                bars,
                ..Default::default()
            })
        }
    }

    fn orchestrator(ttl: Duration) -> Arc<TaskOrchestrator> {
        let predictor = Arc::new(Predictor::new(Arc::new(FlatStore)));
        TaskOrchestrator::new(predictor, TaskConfig { concurrency: 2, ttl })
    }

    async fn wait_terminal(orch: &TaskOrchestrator, id: &str) -> TaskSnapshot {
        for _ in 0..200 {
            let snap = orch.get_task_status(id).unwrap();
            if snap.status.is_terminal() {
                return snap;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task {} never finished", id);
    }

    #[tokio::test]
    async fn test_codes_are_trimmed() {
        let orch = orchestrator(Duration::from_secs(60));
        let err = orch.create_task(["  ", ""], "daily", None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let resp = orch.create_task([" 600000 ", "", "000001"], "", None).unwrap();
        assert!(resp.created);
        assert_eq!(resp.snapshot.total, 2);
        assert_eq!(resp.snapshot.status, TaskStatus::Pending);
        assert!(resp.snapshot.results.is_none());

        let done = wait_terminal(&orch, &resp.snapshot.task_id).await;
        assert_eq!(done.status, TaskStatus::Done);
        let results = done.results.unwrap();
        assert_eq!(results[0].stock_code, "600000");
        assert_eq!(results[1].stock_code, "000001");
    }

    #[tokio::test]
    async fn test_key_released_after_done() {
        let orch = orchestrator(Duration::from_secs(60));
        let first = orch.create_task(["600000"], "daily", Some("k1")).unwrap();
        wait_terminal(&orch, &first.snapshot.task_id).await;

        let second = orch.create_task(["600000"], "daily", Some("k1")).unwrap();
        assert!(second.created);
        assert_ne!(first.snapshot.task_id, second.snapshot.task_id);
    }

    #[tokio::test]
    async fn test_expired_tasks_vanish() {
        let orch = orchestrator(Duration::from_millis(50));
        let resp = orch.create_task(["600000"], "daily", None).unwrap();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(matches!(
            orch.get_task_status(&resp.snapshot.task_id),
            Err(AppError::NotFound(_))
        ));
        assert!(orch.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_cancels_open_tasks() {
        let predictor = Arc::new(Predictor::new(Arc::new(FlatStore)));
        let orch = TaskOrchestrator::new(
            predictor,
            TaskConfig {
                concurrency: 1,
                ttl: Duration::from_secs(60),
            },
        );
        let a = orch.create_task(["600000"], "daily", None).unwrap();
        let b = orch.create_task(["600001"], "daily", None).unwrap();
        orch.shutdown();

        assert_eq!(orch.active_count(), 0);
        for id in [&a.snapshot.task_id, &b.snapshot.task_id] {
            let snap = orch.get_task_status(id).unwrap();
            assert_eq!(snap.status, TaskStatus::Canceled);
            assert_eq!(snap.error.as_deref(), Some("task canceled"));
        }
    }
}
