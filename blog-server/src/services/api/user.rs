use actix_web::web::*;

use crate::handlers::user;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        resource("/users")
            .route(get().to(user::list_all))
            .route(delete().to(user::delete_all)),
    );
}
