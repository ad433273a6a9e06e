use actix_web::web;
use crate::handlers::analytics_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/analytics", web::get().to(analytics_handlers::get_analytics));
}
