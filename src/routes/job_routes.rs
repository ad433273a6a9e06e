use actix_web::web;
use crate::handlers::job_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/jobs")
            .route("", web::get().to(job_handlers::get_jobs))
            .route("", web::post().to(job_handlers::create_job))
            .route("/{id}/apply", web::post().to(job_handlers::apply_for_job))
    );
}
