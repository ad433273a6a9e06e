use actix_web::{web, HttpResponse};
use log::{info, error};
use serde::Deserialize;
use serde_json::json;
use crate::models::{ApiError, UserResponse};
use crate::services::google_auth::IdentityError;
use crate::services::user_service::GoogleSync;
use crate::services::{Clock, IdentityVerifier, UserService};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleSignInRequest {
    pub id_token: String,
    pub phone: Option<String>,
}

pub async fn google_sign_in(
    user_service: web::Data<UserService>,
    verifier: web::Data<dyn IdentityVerifier>,
    clock: web::Data<Clock>,
    payload: web::Json<GoogleSignInRequest>,
) -> Result<HttpResponse, ApiError> {
    let payload = payload.into_inner();
    info!("Google sign-in attempt");

    let profile = verifier.verify(&payload.id_token).await.map_err(|e| {
        error!("Google token verification failed: {}", e);
        match e {
            IdentityError::Invalid(msg) => ApiError::Unauthorized(msg),
            IdentityError::Unavailable(msg) => ApiError::Upstream(msg),
        }
    })?;

    let response = match user_service.sync_google(profile, payload.phone.as_deref(), clock.now()).await? {
        GoogleSync::Linked(user) => {
            info!("Google sign-in for existing user {}", user.phone);
            json!({ "success": true, "user": UserResponse::from(user) })
        }
        GoogleSync::Created(user) => {
            info!("Google sign-in created user {}", user.phone);
            json!({ "success": true, "created": true, "user": UserResponse::from(user) })
        }
        GoogleSync::NeedsPhone(profile) => {
            info!("Google sign-in for {} needs a phone number", profile.email);
            json!({
                "success": true,
                "needsPhone": true,
                "email": profile.email,
                "name": profile.name,
            })
        }
    };
    Ok(HttpResponse::Ok().json(response))
}
