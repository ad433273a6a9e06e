pub mod error;
pub mod role;
pub mod user;
pub mod task;
pub mod payment;
pub mod withdrawal;
pub mod catalog;
pub mod support;
pub mod job;

pub use error::{ApiError, ErrorResponse};
pub use role::Role;
pub use user::{User, UserResponse, CreateUserRequest, PasswordLoginRequest, UpdateUserRequest};
pub use task::{Task, TaskStatus, CreateTaskRequest, UpdateTaskRequest};
pub use payment::{Payment, PaymentStatus, CreatePaymentRequest};
pub use withdrawal::{Withdrawal, WithdrawalStatus, WithdrawalRequest, ProcessWithdrawalRequest};
pub use catalog::{PlatformConfig, Service, ConfigSection};
pub use support::{SupportTicket, TicketStatus, TicketResponse, CreateTicketRequest, UpdateTicketRequest};
pub use job::{JobPosting, JobApplication, CreateJobRequest, ApplyRequest};

/// Lenient timestamp handling for records written by older clients, which stored
/// dates as RFC 3339 strings, epoch milliseconds, or not at all.
pub mod timestamp_opt {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use crate::utils::firestore_codec::{format_timestamp, TIMESTAMP_TOKEN};

    /// Firestore encoding reads the token and stores a timestampValue; JSON bodies get the bare string.
    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => serializer.serialize_newtype_struct(TIMESTAMP_TOKEN, &format_timestamp(ts)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match raw {
            Some(serde_json::Value::String(s)) => DateTime::parse_from_rfc3339(&s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Some(serde_json::Value::Number(n)) => n
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            _ => None,
        })
    }

}

/// `?role=&phone=` as sent by the dashboards to scope a read.
#[derive(Debug, serde::Deserialize)]
pub struct ScopeQuery {
    pub role: Option<String>,
    pub phone: Option<String>,
}
