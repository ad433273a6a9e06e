use actix_web::web;
use crate::handlers::support_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/support")
            .route("", web::get().to(support_handlers::get_tickets))
            .route("", web::post().to(support_handlers::create_ticket))
            .route("/{id}", web::put().to(support_handlers::update_ticket))
    );
}
