use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::{parse_role, require_admin};
use crate::models::{ApiError, CreateTaskRequest, UpdateTaskRequest};
use crate::models::task::TaskQuery;
use crate::services::{Clock, TaskService, UserService};

// List tasks visible to the given role
pub async fn get_tasks(
    task_service: web::Data<TaskService>,
    query: web::Query<TaskQuery>,
) -> Result<HttpResponse, ApiError> {
    let role = parse_role(query.role.as_deref())?;
    info!("Listing tasks for {} {:?}", role, query.phone);

    match task_service.list_for(role, query.phone.as_deref(), query.status.as_deref()).await {
        Ok(tasks) => {
            info!("Retrieved {} tasks", tasks.len());
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "count": tasks.len(),
                "tasks": tasks,
            })))
        }
        Err(e) => {
            error!("Failed to list tasks: {}", e);
            Err(e)
        }
    }
}

pub async fn create_task(
    task_service: web::Data<TaskService>,
    clock: web::Data<Clock>,
    payload: web::Json<CreateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Creating task for {}", payload.customer_phone);

    match task_service.create(payload.into_inner(), clock.now()).await {
        Ok(task) => Ok(HttpResponse::Created().json(json!({ "success": true, "task": task }))),
        Err(e) => {
            error!("Failed to create task: {}", e);
            Err(e)
        }
    }
}

pub async fn get_task(
    task_service: web::Data<TaskService>,
    task_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    info!("Getting task {}", task_id);
    let task = task_service.get(&task_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task })))
}

pub async fn update_task(
    task_service: web::Data<TaskService>,
    clock: web::Data<Clock>,
    task_id: web::Path<String>,
    payload: web::Json<UpdateTaskRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Updating task {}", task_id);

    match task_service.update(&task_id, payload.into_inner(), clock.now()).await {
        Ok(task) => Ok(HttpResponse::Ok().json(json!({ "success": true, "task": task }))),
        Err(e) => {
            error!("Failed to update task {}: {}", task_id, e);
            Err(e)
        }
    }
}

pub async fn delete_task(
    task_service: web::Data<TaskService>,
    user_service: web::Data<UserService>,
    task_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    info!("Admin {} deleting task {}", admin.phone, task_id);

    task_service.delete(&task_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Task deleted" })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use crate::handlers::test_support::{seed_user, services_at, wednesday};

    #[actix_web::test]
    async fn test_task_lifecycle() {
        let services = services_at(wednesday());
        seed_user(&services, "0700000001", "user").await;
        seed_user(&services, "0700000002", "worker").await;
        seed_user(&services, "0700000099", "admin").await;
        let app = test_app!(services);

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(json!({ "customerPhone": "0700000001", "serviceId": "good-conduct" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let id = body["task"]["id"].as_str().unwrap().to_string();
        assert_eq!(body["task"]["price"], 1000.0);
        assert_eq!(body["task"]["status"], "pending");

        let req = test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", id))
            .set_json(json!({ "assignedWorkerPhone": "0700000002", "status": "completed" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["task"]["status"], "completed");
        assert_eq!(body["task"]["progress"], 100);

        let req = test::TestRequest::get().uri("/api/tasks?role=worker&phone=0700000002").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);

        let req = test::TestRequest::get().uri("/api/tasks?role=wizard").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::delete().uri(&format!("/api/tasks/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/tasks/{}", id))
            .insert_header(("X-User-Phone", "0700000099"))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri(&format!("/api/tasks/{}", id)).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }
}
