use actix_web::web;
use crate::handlers::financial_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/financial")
            .route("", web::get().to(financial_handlers::get_financial_summary))
            .route("", web::post().to(financial_handlers::request_withdrawal))
            .route("", web::put().to(financial_handlers::process_withdrawal))
    );
}
