use actix_web::web;
use crate::handlers::commission_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/commissions")
            .route("", web::get().to(commission_handlers::get_commissions))
            .route("", web::post().to(commission_handlers::request_commission_withdrawal))
    );
}
