use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const PAYMENTS: &str = "payments";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Completed => write!(f, "completed"),
            PaymentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A simulated payment against a task. No gateway is involved.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    pub task_id: String,
    pub payer_phone: String,
    pub amount: f64,
    #[serde(default = "default_method")]
    pub method: String,
    pub status: PaymentStatus,
    pub reference: String,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_method() -> String {
    "mpesa".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub task_id: String,
    pub payer_phone: String,
    pub amount: Option<f64>,
    pub method: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub task_id: Option<String>,
    pub phone: Option<String>,
}
