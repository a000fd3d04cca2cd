use actix_web::web::*;

mod auth;
mod blog;
mod user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.configure(auth::configure)
        .configure(user::configure)
        .configure(blog::configure);
}
