use actix_web::web::*;

use crate::handlers::blog;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/blogapi/blogs")
            .service(
                resource("")
                    .route(get().to(blog::list))
                    .route(post().to(blog::create)),
            )
            .service(
                resource("/{blog_id}")
                    .route(get().to(blog::get))
                    .route(put().to(blog::update))
                    .route(delete().to(blog::delete)),
            ),
    );
}
