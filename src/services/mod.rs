pub mod store;
mod memory_store;
mod firestore;
mod token_provider;
pub mod google_auth;
mod clock;
pub mod user_service;
mod config_service;
pub mod task_service;
pub mod financial_service;
mod payment_service;
mod support_service;
mod job_service;
pub mod analytics_service;

use std::sync::Arc;
use actix_web::web;
use log::warn;
use crate::models::ApiError;

pub use store::{DocumentStore, StoreError};
pub use memory_store::MemoryStore;
pub use firestore::FirestoreStore;
pub use google_auth::{GoogleVerifier, IdentityVerifier};
pub use clock::Clock;
pub use user_service::UserService;
pub use config_service::ConfigService;
pub use task_service::TaskService;
pub use financial_service::FinancialService;
pub use payment_service::PaymentService;
pub use support_service::SupportService;
pub use job_service::JobService;
pub use analytics_service::AnalyticsService;

/// Knobs that are not about storage.
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub clock: Clock,
    pub tz_offset_hours: i32,
    pub min_withdrawal: f64,
    pub bcrypt_cost: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            clock: Clock::System,
            tz_offset_hours: 3,
            min_withdrawal: 100.0,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

/// Every service the handlers extract, wired over one store.
#[derive(Clone)]
pub struct Services {
    pub users: web::Data<UserService>,
    pub config: web::Data<ConfigService>,
    pub tasks: web::Data<TaskService>,
    pub financial: web::Data<FinancialService>,
    pub payments: web::Data<PaymentService>,
    pub support: web::Data<SupportService>,
    pub jobs: web::Data<JobService>,
    pub analytics: web::Data<AnalyticsService>,
    pub identity: web::Data<dyn IdentityVerifier>,
    pub clock: web::Data<Clock>,
}

impl Services {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityVerifier>,
        settings: ServiceSettings,
    ) -> Self {
        let users = Arc::new(UserService::new(store.clone()).with_bcrypt_cost(settings.bcrypt_cost));
        let config = Arc::new(ConfigService::new(store.clone()));
        let tasks = Arc::new(TaskService::new(store.clone(), users.clone(), config.clone()));
        let financial = Arc::new(FinancialService::new(
            store.clone(),
            users.clone(),
            tasks.clone(),
            settings.clock,
            settings.tz_offset_hours,
            settings.min_withdrawal,
        ));
        let analytics = AnalyticsService::new(users.clone(), tasks.clone(), financial.clone());

        Self {
            payments: web::Data::new(PaymentService::new(store.clone(), tasks.clone())),
            support: web::Data::new(SupportService::new(store.clone())),
            jobs: web::Data::new(JobService::new(store)),
            analytics: web::Data::new(analytics),
            users: web::Data::from(users),
            config: web::Data::from(config),
            tasks: web::Data::from(tasks),
            financial: web::Data::from(financial),
            identity: web::Data::from(identity),
            clock: web::Data::new(settings.clock),
        }
    }

    /// Register every service as app data, along with extractor configs that
    /// answer malformed bodies and query strings with the usual JSON error.
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
                warn!("Rejected request body: {}", err);
                ApiError::ValidationError(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                warn!("Rejected query string: {}", err);
                ApiError::ValidationError(err.to_string()).into()
            }))
            .app_data(self.users.clone())
            .app_data(self.config.clone())
            .app_data(self.tasks.clone())
            .app_data(self.financial.clone())
            .app_data(self.payments.clone())
            .app_data(self.support.clone())
            .app_data(self.jobs.clone())
            .app_data(self.analytics.clone())
            .app_data(self.identity.clone())
            .app_data(self.clock.clone());
    }
}
