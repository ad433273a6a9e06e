use std::time::{Duration, SystemTime, UNIX_EPOCH};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use log::{debug, info, error};
use reqwest::Client;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio::sync::Mutex;
use crate::config::ServiceAccount;
use crate::services::store::StoreError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const ASSERTION_LIFETIME_SECS: u64 = 3600;
// refresh a little before Google says the token expires
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: SystemTime,
}

/// Exchanges a service-account key for short-lived OAuth access tokens.
pub struct TokenProvider {
    account: ServiceAccount,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(account: ServiceAccount, client: Client) -> Self {
        Self {
            account,
            client,
            cached: Mutex::new(None),
        }
    }

    pub async fn access_token(&self) -> Result<String, StoreError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if SystemTime::now() + EXPIRY_MARGIN < token.expires_at {
                return Ok(token.token.clone());
            }
            debug!("Cached Firestore access token is about to expire, refreshing");
        }

        let now = SystemTime::now();
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StoreError::Auth(e.to_string()))?
            .as_secs();
        let assertion = sign_assertion(&self.account, iat).map_err(StoreError::Auth)?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "unable to read error response".to_string());
            error!("Token exchange failed: HTTP {} - {}", status, body);
            return Err(StoreError::Auth(format!("token exchange returned HTTP {}", status)));
        }

        let token: TokenResponse = response.json().await?;
        info!("Obtained Firestore access token for {} (expires in {}s)", self.account.client_email, token.expires_in);

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: now + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }
}

/// Build the RS256-signed JWT used as the OAuth assertion.
pub(crate) fn sign_assertion(account: &ServiceAccount, iat: u64) -> Result<String, String> {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let claims = Claims {
        iss: &account.client_email,
        scope: DATASTORE_SCOPE,
        aud: TOKEN_URL,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };
    let claims = serde_json::to_vec(&claims).map_err(|e| e.to_string())?;
    let signing_input = format!("{}.{}", header, URL_SAFE_NO_PAD.encode(claims));

    // Parse RSA private key from PEM (try PKCS#8 first, then PKCS#1)
    let private_key = match RsaPrivateKey::from_pkcs8_pem(&account.private_key) {
        Ok(k) => k,
        Err(_) => RsaPrivateKey::from_pkcs1_pem(&account.private_key)
            .map_err(|e| format!("invalid service account private key: {}", e))?,
    };
    let signing_key = SigningKey::<Sha256>::new(private_key);
    let signature = signing_key.sign(signing_input.as_bytes());

    Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature.to_vec())))
}
