use actix_web::web::*;

use crate::handlers::auth;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(resource("/registration").route(post().to(auth::register)))
        .service(resource("/login").route(post().to(auth::login)))
        .service(
            scope("/logout")
                .service(resource("/access").route(post().to(auth::logout_access)))
                .service(resource("/refresh").route(post().to(auth::logout_refresh))),
        )
        .service(resource("/token/refresh").route(post().to(auth::refresh)));
}
