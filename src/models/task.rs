use std::fmt;
use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const TASKS: &str = "tasks";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
    /// A label written by some other client. Kept verbatim so it survives a rewrite.
    #[serde(untagged)]
    Other(String),
}

impl TaskStatus {
    /// Parse a status sent by a client. Only the known labels are accepted.
    pub fn parse_known(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "assigned" => Ok(TaskStatus::Assigned),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Other(label) => label,
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Some clients wrote progress as a double or a numeric string.
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    let value = match raw {
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(serde_json::Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

fn default_payment_status() -> String {
    "unpaid".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub customer_phone: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    #[serde(default)]
    pub assigned_worker_phone: Option<String>,
    #[serde(default = "default_payment_status")]
    pub payment_status: String,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub customer_phone: String,
    pub customer_name: Option<String>,
    pub service_id: Option<String>,
    pub service_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub assigned_worker_phone: Option<String>,
    pub status: Option<String>,
    pub progress: Option<i64>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub role: Option<String>,
    pub phone: Option<String>,
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_value(TaskStatus::InProgress).unwrap(), json!("in_progress"));
        let status: TaskStatus = serde_json::from_value(json!("completed")).unwrap();
        assert_eq!(status, TaskStatus::Completed);
    }

    #[test]
    fn test_unknown_stored_status_is_preserved() {
        let status: TaskStatus = serde_json::from_value(json!("awaiting documents")).unwrap();
        assert_eq!(status, TaskStatus::Other("awaiting documents".to_string()));
        assert_eq!(serde_json::to_value(&status).unwrap(), json!("awaiting documents"));
    }

    #[test]
    fn test_parse_known() {
        assert_eq!(TaskStatus::parse_known("In Progress").unwrap(), TaskStatus::InProgress);
        assert_eq!(TaskStatus::parse_known("canceled").unwrap(), TaskStatus::Cancelled);
        assert!(TaskStatus::parse_known("awaiting documents").is_err());
    }

    #[test]
    fn test_task_defaults_from_sparse_record() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "customerPhone": "+254700000000",
            "price": 1500
        }))
        .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.payment_status, "unpaid");
        assert_eq!(task.price, 1500.0);
        assert!(task.created_at.is_none());
        assert_eq!(task.progress, 0);
    }

    #[test]
    fn test_progress_is_lenient() {
        let task: Task = serde_json::from_value(json!({
            "customerPhone": "+254700000000",
            "progress": 62.5
        }))
        .unwrap();
        assert_eq!(task.progress, 63);

        let task: Task = serde_json::from_value(json!({
            "customerPhone": "+254700000000",
            "progress": "40%"
        }))
        .unwrap();
        assert_eq!(task.progress, 40);
    }
}
