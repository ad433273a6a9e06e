use actix_web::web;
use crate::handlers::auth_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/google", web::post().to(auth_handlers::google_sign_in))
    );
}
