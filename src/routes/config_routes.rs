use actix_web::web;
use crate::handlers::config_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/config")
            .route("", web::get().to(config_handlers::get_config))
            .route("", web::post().to(config_handlers::add_config_item))
            .route("", web::put().to(config_handlers::update_config))
            .route("", web::delete().to(config_handlers::delete_config_item))
    )
    .route("/services", web::get().to(config_handlers::get_services));
}
