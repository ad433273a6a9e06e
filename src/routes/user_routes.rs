use actix_web::web;
use crate::handlers::user_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("", web::get().to(user_handlers::get_users))
            .route("", web::post().to(user_handlers::create_user))
            .route("", web::patch().to(user_handlers::password_login))
            .route("/referrals", web::get().to(user_handlers::get_referrals))
            .route("/{id}", web::put().to(user_handlers::update_user))
    );
}
