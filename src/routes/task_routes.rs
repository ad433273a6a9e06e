use actix_web::web;
use crate::handlers::task_handlers;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(task_handlers::get_tasks))
            .route("", web::post().to(task_handlers::create_task))
            .route("/{id}", web::get().to(task_handlers::get_task))
            .route("/{id}", web::put().to(task_handlers::update_task))
            .route("/{id}", web::delete().to(task_handlers::delete_task))
    );
}
