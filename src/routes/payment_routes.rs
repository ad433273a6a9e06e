use actix_web::web;
use crate::handlers::payment_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("", web::get().to(payment_handlers::get_payments))
            .route("", web::post().to(payment_handlers::create_payment))
    );
}
