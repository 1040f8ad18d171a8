use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::PredictResult;

/// Lifecycle state of a prediction task.
///
/// `Pending -> Running -> {Done | Failed | Canceled}`; a pending task may
/// also be canceled directly. Terminal states never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Canceled,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Canceled)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

/// Point-in-time view of a task handed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub task_id: String,
    pub status: TaskStatus,
    /// Code currently being processed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_code: Option<String>,
    pub done: usize,
    pub total: usize,
    /// Only populated once the task is terminal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PredictResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Response to a create request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
    #[serde(flatten)]
    pub snapshot: TaskSnapshot,
    /// `false` when an idempotency key matched an existing task.
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Canceled.is_terminal());
    }

    #[test]
    fn test_create_response_is_flat() {
        let now = Utc::now();
        let response = CreateTaskResponse {
            snapshot: TaskSnapshot {
                task_id: "abc".to_string(),
                status: TaskStatus::Pending,
                current_code: None,
                done: 0,
                total: 2,
                results: None,
                error: None,
                created_at: now,
                expires_at: now,
            },
            created: true,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["task_id"], "abc");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["total"], 2);
        assert_eq!(json["created"], true);
        assert!(json.get("results").is_none());
    }
}
