use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, warn, error};
use serde_json::json;
use crate::handlers::{parse_role, require_admin};
use crate::models::{ApiError, ProcessWithdrawalRequest, Role, ScopeQuery, WithdrawalRequest};
use crate::services::{FinancialService, UserService};

pub async fn get_financial_summary(
    financial_service: web::Data<FinancialService>,
    user_service: web::Data<UserService>,
    query: web::Query<ScopeQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let role = parse_role(query.role.as_deref())?;
    info!("Getting financial summary for {} {:?}", role, query.phone);

    match role {
        Role::Admin => {
            require_admin(&user_service, &req).await?;
            let summary = financial_service.platform_summary().await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary })))
        }
        Role::Worker | Role::Manager => {
            let summary = financial_service.balance_summary(query.phone.as_deref()).await?;
            Ok(HttpResponse::Ok().json(json!({ "success": true, "data": summary })))
        }
        Role::User => Err(ApiError::Forbidden("Customers have no earnings".to_string())),
    }
}

pub async fn request_withdrawal(
    financial_service: web::Data<FinancialService>,
    payload: web::Json<WithdrawalRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Withdrawal of {} requested by {}", payload.amount, payload.user_phone);

    match financial_service.request_withdrawal(payload.into_inner(), true).await {
        Ok(withdrawal) => {
            info!("Withdrawal {} recorded", withdrawal.id);
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "message": "Withdrawal request submitted",
                "withdrawal": withdrawal,
            })))
        }
        Err(e @ ApiError::WithdrawalClosed { .. }) => {
            warn!("Withdrawal refused: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Withdrawal request failed: {}", e);
            Err(e)
        }
    }
}

pub async fn process_withdrawal(
    financial_service: web::Data<FinancialService>,
    user_service: web::Data<UserService>,
    payload: web::Json<ProcessWithdrawalRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let admin = require_admin(&user_service, &req).await?;
    info!("Admin {} setting withdrawal {} to {}", admin.phone, payload.withdrawal_id, payload.status);

    match financial_service.process_withdrawal(payload.into_inner()).await {
        Ok(withdrawal) => Ok(HttpResponse::Ok().json(json!({ "success": true, "withdrawal": withdrawal }))),
        Err(e) => {
            error!("Failed to process withdrawal: {}", e);
            Err(e)
        }
    }
}
