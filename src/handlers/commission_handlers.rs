use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::{parse_role, require_admin};
use crate::models::{ApiError, Role, ScopeQuery, WithdrawalRequest};
use crate::services::{FinancialService, UserService};
use crate::utils::withdrawal_schedule::PROCESSING_DAYS;

pub async fn get_commissions(
    financial_service: web::Data<FinancialService>,
    user_service: web::Data<UserService>,
    query: web::Query<ScopeQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let role = parse_role(query.role.as_deref())?;
    if role == Role::Admin {
        require_admin(&user_service, &req).await?;
    }
    info!("Getting commissions for {} {:?}", role, query.phone);

    match financial_service.commission_report(role, query.phone.as_deref()).await {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": report }))),
        Err(e) => {
            error!("Failed to build commission report: {}", e);
            Err(e)
        }
    }
}

// Queue a withdrawal from the commission dashboard; paid out on the next processing day
pub async fn request_commission_withdrawal(
    financial_service: web::Data<FinancialService>,
    payload: web::Json<WithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Commission withdrawal of {} requested by {}", payload.amount, payload.user_phone);

    match financial_service.request_withdrawal(payload.into_inner(), false).await {
        Ok(withdrawal) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "status": "pending",
            "processingDays": PROCESSING_DAYS,
            "withdrawal": withdrawal,
        }))),
        Err(e) => {
            error!("Commission withdrawal failed: {}", e);
            Err(e)
        }
    }
}
