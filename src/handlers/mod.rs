#[cfg(test)]
#[macro_use]
mod test_support;

pub mod user_handlers;
pub mod auth_handlers;
pub mod task_handlers;
pub mod commission_handlers;
pub mod financial_handlers;
pub mod payment_handlers;
pub mod support_handlers;
pub mod analytics_handlers;
pub mod config_handlers;
pub mod job_handlers;

use actix_web::HttpRequest;
use crate::models::{ApiError, Role, User};
use crate::services::UserService;

pub const ACTING_USER_HEADER: &str = "X-User-Phone";

/// Phone of the user making the request, if the client sent one.
pub fn acting_phone(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(ACTING_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub async fn require_admin(users: &UserService, req: &HttpRequest) -> Result<User, ApiError> {
    users.require_role(acting_phone(req).as_deref(), &[Role::Admin]).await
}

/// `role` query parameter; required for role-scoped reads.
pub fn parse_role(role: Option<&str>) -> Result<Role, ApiError> {
    role.filter(|r| !r.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("role is required".to_string()))?
        .parse::<Role>()
        .map_err(ApiError::ValidationError)
}
