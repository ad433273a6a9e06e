use actix_web::{web, HttpRequest, HttpResponse};
use log::{info, error};
use serde_json::json;
use crate::handlers::{acting_phone, require_admin};
use crate::models::{ApiError, CreateUserRequest, PasswordLoginRequest, Role, UpdateUserRequest, UserResponse};
use crate::models::user::UserQuery;
use crate::services::{Clock, UserService};

// Look a user up by phone or email (the phone-only login), or list users for an admin
pub async fn get_users(
    user_service: web::Data<UserService>,
    query: web::Query<UserQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let query = query.into_inner();

    let found = match (query.phone.as_deref(), query.email.as_deref()) {
        (Some(phone), _) if !phone.trim().is_empty() => {
            info!("Looking up user by phone {}", phone);
            Some(user_service.find_by_phone(phone).await)
        }
        (_, Some(email)) if !email.trim().is_empty() => {
            info!("Looking up user by email {}", email);
            Some(user_service.find_by_email(email).await)
        }
        _ => None,
    };

    if let Some(result) = found {
        return match result {
            Ok(Some(user)) => Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "user": UserResponse::from(user),
            }))),
            Ok(None) => {
                info!("User not found");
                Err(ApiError::NotFound("User not found".to_string()))
            }
            Err(e) => {
                error!("Failed to look up user: {}", e);
                Err(e)
            }
        };
    }

    require_admin(&user_service, &req).await?;
    let role = match query.role.as_deref().filter(|r| !r.trim().is_empty()) {
        Some(role) => Some(role.parse::<Role>().map_err(ApiError::ValidationError)?),
        None => None,
    };
    info!("Listing users (role filter: {:?})", role);

    let users: Vec<UserResponse> = user_service.list(role).await?.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": users.len(),
        "users": users,
    })))
}

pub async fn create_user(
    user_service: web::Data<UserService>,
    clock: web::Data<Clock>,
    payload: web::Json<CreateUserRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    info!("Creating user {}", payload.phone);

    // staff accounts are created by an admin, never by self-signup
    let wants_staff_role = payload
        .role
        .as_deref()
        .and_then(|r| r.parse::<Role>().ok())
        .map_or(false, |r| matches!(r, Role::Manager | Role::Admin));
    if wants_staff_role {
        require_admin(&user_service, &req).await?;
    }

    match user_service.create(payload, clock.now()).await {
        Ok(user) => {
            info!("Created user {}", user.id);
            Ok(HttpResponse::Created().json(json!({
                "success": true,
                "user": UserResponse::from(user),
            })))
        }
        Err(e) => {
            error!("Failed to create user: {}", e);
            Err(e)
        }
    }
}

pub async fn password_login(
    user_service: web::Data<UserService>,
    payload: web::Json<PasswordLoginRequest>,
) -> Result<HttpResponse, ApiError> {
    info!("Password login attempt");
    let user = user_service.login_with_password(payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": UserResponse::from(user),
    })))
}

pub async fn update_user(
    user_service: web::Data<UserService>,
    clock: web::Data<Clock>,
    user_id: web::Path<String>,
    payload: web::Json<UpdateUserRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    info!("Updating user {} (acting: {:?})", user_id, acting_phone(&req));

    let actor_is_admin = if payload.role.is_some() {
        require_admin(&user_service, &req).await?;
        true
    } else {
        false
    };

    match user_service.update(&user_id, payload, actor_is_admin, clock.now()).await {
        Ok(user) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "user": UserResponse::from(user),
        }))),
        Err(e) => {
            error!("Failed to update user {}: {}", user_id, e);
            Err(e)
        }
    }
}

#[derive(serde::Deserialize)]
pub struct ReferralQuery {
    pub phone: Option<String>,
}

pub async fn get_referrals(
    user_service: web::Data<UserService>,
    query: web::Query<ReferralQuery>,
) -> Result<HttpResponse, ApiError> {
    let phone = query
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("phone is required".to_string()))?;
    info!("Getting referrals for {}", phone);

    let (user, referred) = user_service.referrals(phone).await?;
    let referrals: Vec<UserResponse> = referred.iter().map(UserResponse::from).collect();
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "referralCode": user.referral_code,
        "count": referrals.len(),
        "referrals": referrals,
    })))
}
