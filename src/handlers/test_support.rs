use std::sync::Arc;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use crate::services::google_auth::{GoogleProfile, IdentityError, IdentityVerifier};
use crate::services::{Clock, MemoryStore, ServiceSettings, Services};

/// Accepts `good:<sub>:<email>` tokens and rejects everything else.
pub struct FakeVerifier;

#[async_trait]
impl IdentityVerifier for FakeVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleProfile, IdentityError> {
        match id_token.split(':').collect::<Vec<_>>().as_slice() {
            ["good", subject, email] => Ok(GoogleProfile {
                subject: subject.to_string(),
                email: email.to_string(),
                name: Some("Test User".to_string()),
            }),
            _ => Err(IdentityError::Invalid("bad token".to_string())),
        }
    }
}

// 2024-03-06 is a Wednesday, 2024-03-04 a Monday
pub fn wednesday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 6, 9, 0, 0).unwrap()
}

pub fn monday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
}

pub fn services_at(now: DateTime<Utc>) -> Services {
    Services::new(
        Arc::new(MemoryStore::new()),
        Arc::new(FakeVerifier),
        ServiceSettings {
            clock: Clock::Fixed(now),
            bcrypt_cost: 4,
            ..ServiceSettings::default()
        },
    )
}

macro_rules! test_app {
    ($services:expr) => {{
        let services = $services.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .configure(move |cfg| services.configure(cfg))
                .configure(crate::routes::configure),
        )
        .await
    }};
}

pub async fn seed_user(services: &Services, phone: &str, role: &str) -> crate::models::User {
    services
        .users
        .create(
            crate::models::CreateUserRequest {
                phone: phone.to_string(),
                email: None,
                name: format!("User {}", phone),
                role: Some(role.to_string()),
                password: None,
                referred_by: None,
                manager_phone: None,
            },
            wednesday(),
        )
        .await
        .unwrap()
}
