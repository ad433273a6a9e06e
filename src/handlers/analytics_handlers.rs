use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::{parse_role, require_admin};
use crate::models::{ApiError, Role, ScopeQuery};
use crate::services::{AnalyticsService, UserService};

pub async fn get_analytics(
    analytics_service: web::Data<AnalyticsService>,
    user_service: web::Data<UserService>,
    query: web::Query<ScopeQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let role = parse_role(query.role.as_deref())?;
    if role == Role::Admin {
        require_admin(&user_service, &req).await?;
    }
    info!("Building {} analytics for {:?}", role, query.phone);

    match analytics_service.for_role(role, query.phone.as_deref()).await {
        Ok(analytics) => Ok(HttpResponse::Ok().json(json!({ "success": true, "data": analytics }))),
        Err(e) => {
            error!("Failed to build analytics: {}", e);
            Err(e)
        }
    }
}
