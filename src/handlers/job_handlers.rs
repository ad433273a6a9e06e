use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::require_admin;
use crate::models::{ApiError, ApplyRequest, CreateJobRequest};
use crate::services::{Clock, JobService, UserService};

pub async fn get_jobs(job_service: web::Data<JobService>) -> Result<HttpResponse, ApiError> {
    info!("Listing open job postings");
    let jobs = job_service.active_postings().await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": jobs.len(),
        "jobs": jobs,
    })))
}

pub async fn create_job(
    job_service: web::Data<JobService>,
    user_service: web::Data<UserService>,
    clock: web::Data<Clock>,
    payload: web::Json<CreateJobRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    info!("Admin {} posting job {}", admin.phone, payload.title);

    match job_service.create(payload.into_inner(), clock.now()).await {
        Ok(job) => Ok(HttpResponse::Created().json(json!({ "success": true, "job": job }))),
        Err(e) => {
            error!("Failed to create job posting: {}", e);
            Err(e)
        }
    }
}

pub async fn apply_for_job(
    job_service: web::Data<JobService>,
    clock: web::Data<Clock>,
    job_id: web::Path<String>,
    payload: web::Json<ApplyRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Application for job {} from {}", job_id, payload.phone);

    match job_service.apply(&job_id, payload.into_inner(), clock.now()).await {
        Ok(application) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "application": application,
        }))),
        Err(e) => {
            error!("Failed to record application for job {}: {}", job_id, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use crate::handlers::test_support::{seed_user, services_at, wednesday};

    #[actix_web::test]
    async fn test_post_and_apply() {
        let services = services_at(wednesday());
        seed_user(&services, "0700000099", "admin").await;
        let app = test_app!(services);

        let req = test::TestRequest::post()
            .uri("/api/jobs")
            .insert_header(("X-User-Phone", "0700000099"))
            .set_json(json!({ "title": "Cyber Cafe Agent", "location": "Kisumu" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["job"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri("/api/jobs").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);

        let req = test::TestRequest::post()
            .uri(&format!("/api/jobs/{}/apply", id))
            .set_json(json!({ "name": "Brian", "phone": "0711222333" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/jobs/nope/apply")
            .set_json(json!({ "name": "Brian", "phone": "0711222333" }))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
