use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

pub const JOBS: &str = "jobs";
pub const JOB_APPLICATIONS: &str = "job_applications";

/// An opening advertised on the careers page.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub location: String,
    #[serde(default = "default_employment_type")]
    pub employment_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_employment_type() -> String {
    "commission".to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    #[serde(default)]
    pub id: String,
    pub job_id: String,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    pub status: String,
    #[serde(default, with = "crate::models::timestamp_opt")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub title: String,
    pub department: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub referral_code: Option<String>,
    pub cover_letter: Option<String>,
}
