use std::sync::Arc;
use chrono::{DateTime, Utc};
use log::info;
use crate::models::{ApiError, ApplyRequest, CreateJobRequest, JobApplication, JobPosting};
use crate::models::job::{JOBS, JOB_APPLICATIONS};
use crate::services::store::{decode_all, DocumentStore};
use crate::utils::firestore_codec;
use crate::utils::phone::{is_plausible_phone, normalize_phone};
use crate::utils::referral_code::normalize_referral_code;

/// Careers page: postings and the applications sent against them.
pub struct JobService {
    store: Arc<dyn DocumentStore>,
}

impl JobService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn active_postings(&self) -> Result<Vec<JobPosting>, ApiError> {
        let mut jobs: Vec<JobPosting> = decode_all(JOBS, self.store.list(JOBS).await?);
        jobs.retain(|j| j.active);
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    pub async fn create(&self, req: CreateJobRequest, now: DateTime<Utc>) -> Result<JobPosting, ApiError> {
        if req.title.trim().is_empty() {
            return Err(ApiError::ValidationError("title is required".to_string()));
        }
        let job = JobPosting {
            id: String::new(),
            title: req.title.trim().to_string(),
            department: req.department.unwrap_or_default(),
            location: req.location.unwrap_or_else(|| "Remote".to_string()),
            employment_type: req.employment_type.unwrap_or_else(|| "commission".to_string()),
            description: req.description.unwrap_or_default(),
            requirements: req.requirements,
            active: true,
            created_at: Some(now),
        };
        let doc = self.store.create(JOBS, None, firestore_codec::encode(&job)?).await?;
        info!("Job posting {} created: {}", doc.id, job.title);
        Ok(doc.decode()?)
    }

    pub async fn apply(&self, job_id: &str, req: ApplyRequest, now: DateTime<Utc>) -> Result<JobApplication, ApiError> {
        let job: JobPosting = match self.store.get(JOBS, job_id).await? {
            Some(doc) => doc.decode()?,
            None => return Err(ApiError::NotFound(format!("Job {} not found", job_id))),
        };
        if !job.active {
            return Err(ApiError::NotFound(format!("Job {} is no longer open", job_id)));
        }
        if req.name.trim().is_empty() {
            return Err(ApiError::ValidationError("name is required".to_string()));
        }
        if !is_plausible_phone(&req.phone) {
            return Err(ApiError::ValidationError(format!("Invalid phone number: {}", req.phone)));
        }

        let application = JobApplication {
            id: String::new(),
            job_id: job.id.clone(),
            name: req.name.trim().to_string(),
            phone: normalize_phone(&req.phone),
            email: req.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty()),
            referral_code: req
                .referral_code
                .map(|c| normalize_referral_code(&c))
                .filter(|c| !c.is_empty()),
            cover_letter: req.cover_letter,
            status: "received".to_string(),
            created_at: Some(now),
        };
        let doc = self
            .store
            .create(JOB_APPLICATIONS, None, firestore_codec::encode(&application)?)
            .await?;
        info!("Application {} received for job {} from {}", doc.id, job.id, application.phone);
        Ok(doc.decode()?)
    }
}
