use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const SUPPORT_TICKETS: &str = "support_tickets";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("Unknown ticket status: {}", other)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub from: String,
    pub message: String,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    #[serde(default)]
    pub id: String,
    pub user_phone: String,
    pub subject: String,
    pub message: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_priority")]
    pub priority: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub responses: Vec<TicketResponse>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_priority() -> String {
    "normal".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub user_phone: String,
    pub subject: String,
    pub message: String,
    pub category: Option<String>,
    pub priority: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    pub status: Option<String>,
    pub response: Option<String>,
    pub responder: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SupportQuery {
    pub phone: Option<String>,
}
