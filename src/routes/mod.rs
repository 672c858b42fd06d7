pub mod health;
pub mod tasks;
pub mod users;

use actix_web::web;

/// Registers every route on the paths the API exposes. Protected handlers
/// authenticate through the `AuthSession` extractor rather than a scope-wide
/// middleware, so public and protected routes can share the `/users` prefix.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(users::register)
        .service(users::login)
        .service(users::logout)
        .service(users::logout_all)
        .service(users::profile)
        .service(users::update_profile)
        .service(users::delete_profile)
        .service(users::upload_avatar)
        .service(users::delete_avatar)
        .service(users::get_avatar)
        .service(tasks::create_task)
        .service(tasks::list_tasks)
        .service(tasks::get_task)
        .service(tasks::update_task)
        .service(tasks::delete_task);
}
