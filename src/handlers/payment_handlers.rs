use actix_web::{web, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::models::{ApiError, CreatePaymentRequest};
use crate::models::payment::PaymentQuery;
use crate::services::{Clock, PaymentService};

pub async fn create_payment(
    payment_service: web::Data<PaymentService>,
    clock: web::Data<Clock>,
    payload: web::Json<CreatePaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Recording payment for task {} from {}", payload.task_id, payload.payer_phone);

    match payment_service.create(payload.into_inner(), clock.now()).await {
        Ok(payment) => Ok(HttpResponse::Created().json(json!({ "success": true, "payment": payment }))),
        Err(e) => {
            error!("Failed to record payment: {}", e);
            Err(e)
        }
    }
}

pub async fn get_payments(
    payment_service: web::Data<PaymentService>,
    query: web::Query<PaymentQuery>,
) -> Result<HttpResponse, ApiError> {
    let task_id = query.task_id.as_deref().filter(|t| !t.trim().is_empty());
    let phone = query.phone.as_deref().filter(|p| !p.trim().is_empty());
    if task_id.is_none() && phone.is_none() {
        return Err(ApiError::ValidationError("taskId or phone is required".to_string()));
    }
    info!("Listing payments (task {:?}, phone {:?})", task_id, phone);

    let payments = payment_service.list(task_id, phone).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": payments.len(),
        "payments": payments,
    })))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use serde_json::{json, Value};
    use crate::handlers::test_support::{seed_user, services_at, wednesday};

    #[actix_web::test]
    async fn test_pay_once() {
        let services = services_at(wednesday());
        seed_user(&services, "0700000001", "user").await;
        let app = test_app!(services);

        let req = test::TestRequest::post()
            .uri("/api/tasks")
            .set_json(json!({ "customerPhone": "0700000001", "serviceId": "kra-pin" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let task_id = body["task"]["id"].as_str().unwrap().to_string();

        let pay = json!({ "taskId": task_id, "payerPhone": "0700000001" });
        let req = test::TestRequest::post().uri("/api/payments").set_json(&pay).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["payment"]["amount"], 500.0);
        assert_eq!(body["payment"]["status"], "completed");

        let req = test::TestRequest::post().uri("/api/payments").set_json(&pay).to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get().uri(&format!("/api/payments?taskId={}", task_id)).to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["count"], 1);

        let req = test::TestRequest::get().uri("/api/payments").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
