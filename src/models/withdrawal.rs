use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use crate::models::Role;

pub const WITHDRAWALS: &str = "withdrawals";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
}

impl WithdrawalStatus {
    /// Whether the amount is committed and no longer part of the available balance.
    pub fn holds_funds(&self) -> bool {
        !matches!(self, WithdrawalStatus::Rejected)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, WithdrawalStatus::Rejected | WithdrawalStatus::Completed)
    }
}

impl std::fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            WithdrawalStatus::Pending => write!(f, "pending"),
            WithdrawalStatus::Approved => write!(f, "approved"),
            WithdrawalStatus::Rejected => write!(f, "rejected"),
            WithdrawalStatus::Completed => write!(f, "completed"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    #[serde(default)]
    pub id: String,
    pub user_phone: String,
    pub user_role: Role,
    pub amount: f64,
    #[serde(default)]
    pub method: Option<String>,
    pub status: WithdrawalStatus,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub requested_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub admin_note: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub user_phone: String,
    pub user_role: String,
    pub amount: f64,
    pub method: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProcessWithdrawalRequest {
    pub withdrawal_id: String,
    pub status: String,
    pub admin_note: Option<String>,
}
