mod user_routes;
mod auth_routes;
mod task_routes;
mod commission_routes;
mod financial_routes;
mod payment_routes;
mod support_routes;
mod analytics_routes;
mod config_routes;
mod job_routes;

use actix_web::{middleware::Logger, web};

pub use user_routes::configure as configure_user_routes;
pub use auth_routes::configure as configure_auth_routes;
pub use task_routes::configure as configure_task_routes;
pub use commission_routes::configure as configure_commission_routes;
pub use financial_routes::configure as configure_financial_routes;
pub use payment_routes::configure as configure_payment_routes;
pub use support_routes::configure as configure_support_routes;
pub use analytics_routes::configure as configure_analytics_routes;
pub use config_routes::configure as configure_config_routes;
pub use job_routes::configure as configure_job_routes;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(Logger::default())
            .configure(configure_user_routes)
            .configure(configure_auth_routes)
            .configure(configure_task_routes)
            .configure(configure_commission_routes)
            .configure(configure_financial_routes)
            .configure(configure_payment_routes)
            .configure(configure_support_routes)
            .configure(configure_analytics_routes)
            .configure(configure_config_routes)
            .configure(configure_job_routes)
    );
}
