use async_trait::async_trait;
use log::{info, error};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// The parts of a verified Google identity we keep.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleProfile {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("invalid ID token: {0}")]
    Invalid(String),
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, IdentityError>;
}

#[derive(Deserialize)]
struct TokenInfo {
    iss: String,
    sub: String,
    aud: String,
    email: Option<String>,
    // tokeninfo reports booleans as strings
    email_verified: Option<String>,
    name: Option<String>,
}

/// Verifies Google ID tokens with the tokeninfo endpoint.
pub struct GoogleVerifier {
    client: Client,
    client_id: Option<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            client_id,
        }
    }
}

const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

fn check_token_info(info: TokenInfo, client_id: Option<&str>) -> Result<GoogleProfile, IdentityError> {
    if !GOOGLE_ISSUERS.contains(&info.iss.as_str()) {
        return Err(IdentityError::Invalid(format!("token issued by {}", info.iss)));
    }
    if let Some(expected) = client_id {
        if info.aud != expected {
            return Err(IdentityError::Invalid(format!("token issued for another client ({})", info.aud)));
        }
    }
    let email = info
        .email
        .ok_or_else(|| IdentityError::Invalid("token carries no email".to_string()))?;
    if info.email_verified.as_deref() != Some("true") {
        return Err(IdentityError::Invalid(format!("email {} is not verified", email)));
    }
    Ok(GoogleProfile {
        subject: info.sub,
        email: email.to_lowercase(),
        name: info.name,
    })
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, IdentityError> {
        let response = self
            .client
            .get(TOKENINFO_URL)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!("Request to Google tokeninfo failed: {:?}", e);
                IdentityError::Unavailable(e.to_string())
            })?;

        match response.status() {
            s if s.is_success() => {
                let info: TokenInfo = response
                    .json()
                    .await
                    .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
                let profile = check_token_info(info, self.client_id.as_deref())?;
                info!("Verified Google identity for {}", profile.email);
                Ok(profile)
            }
            StatusCode::BAD_REQUEST => Err(IdentityError::Invalid("token rejected by Google".to_string())),
            s => Err(IdentityError::Unavailable(format!("tokeninfo returned HTTP {}", s))),
        }
    }
}
