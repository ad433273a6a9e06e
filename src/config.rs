use std::env;
use std::str::FromStr;
use log::{info, warn};
use thiserror::Error;

const DEFAULT_DATABASE: &str = "(default)";
const DEFAULT_TZ_OFFSET_HOURS: i32 = 3;
const DEFAULT_MIN_WITHDRAWAL: f64 = 100.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Service-account credential used to mint OAuth tokens for Firestore.
#[derive(Clone)]
pub struct ServiceAccount {
    pub client_email: String,
    pub private_key: String,
}

// keep the key out of logs
impl std::fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("client_email", &self.client_email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub database: String,
    pub api_key: Option<String>,
    pub service_account: Option<ServiceAccount>,
    pub emulator_host: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StoreBackend {
    Firestore,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: StoreBackend,
    /// Only present for the Firestore backend.
    pub firestore: Option<FirestoreConfig>,
    pub google_client_id: Option<String>,
    pub withdrawal_tz_offset_hours: i32,
    pub min_withdrawal: f64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("SERVER_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { name: "SERVER_PORT", value: raw })?,
            None => 8080,
        };

        let backend = match var("STORE_BACKEND") {
            Some(raw) => raw
                .parse::<StoreBackend>()
                .map_err(|value| ConfigError::Invalid { name: "STORE_BACKEND", value })?,
            None => StoreBackend::Firestore,
        };

        let firestore = match backend {
            StoreBackend::Firestore => Some(firestore_config(&var)?),
            StoreBackend::Memory => {
                warn!("STORE_BACKEND=memory: data lives only as long as this process");
                None
            }
        };

        let withdrawal_tz_offset_hours = match var("WITHDRAWAL_TZ_OFFSET_HOURS") {
            Some(raw) => match raw.parse::<i32>() {
                Ok(hours) if (-12..=14).contains(&hours) => hours,
                _ => return Err(ConfigError::Invalid { name: "WITHDRAWAL_TZ_OFFSET_HOURS", value: raw }),
            },
            None => DEFAULT_TZ_OFFSET_HOURS,
        };

        let min_withdrawal = match var("MIN_WITHDRAWAL") {
            Some(raw) => match raw.parse::<f64>() {
                Ok(amount) if amount.is_finite() && amount >= 0.0 => amount,
                _ => return Err(ConfigError::Invalid { name: "MIN_WITHDRAWAL", value: raw }),
            },
            None => DEFAULT_MIN_WITHDRAWAL,
        };

        Ok(AppConfig {
            host: var("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            backend,
            firestore,
            google_client_id: var("GOOGLE_CLIENT_ID"),
            withdrawal_tz_offset_hours,
            min_withdrawal,
        })
    }
}

fn firestore_config<F>(var: &F) -> Result<FirestoreConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let project_id = var("FIRESTORE_PROJECT_ID").ok_or(ConfigError::Missing("FIRESTORE_PROJECT_ID"))?;

    let service_account = match (var("FIRESTORE_CLIENT_EMAIL"), var("FIRESTORE_PRIVATE_KEY")) {
        (Some(client_email), Some(private_key)) => {
            info!("Loaded service account {} from environment", client_email);
            Some(ServiceAccount {
                client_email,
                // keys pasted into .env files arrive with literal \n sequences
                private_key: private_key.replace("\\n", "\n"),
            })
        }
        (Some(_), None) => return Err(ConfigError::Missing("FIRESTORE_PRIVATE_KEY")),
        (None, Some(_)) => return Err(ConfigError::Missing("FIRESTORE_CLIENT_EMAIL")),
        (None, None) => None,
    };

    Ok(FirestoreConfig {
        project_id,
        database: var("FIRESTORE_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
        api_key: var("FIRESTORE_API_KEY"),
        service_account,
        emulator_host: var("FIRESTORE_EMULATOR_HOST"),
    })
}
