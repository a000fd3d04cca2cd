use blog_common::db::UserStore;
use blog_common::request_io::outputs::{OutputMessage, OutputUser, OutputUserList};

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::AdminAccess;

pub async fn list_all(
    users: web::Data<dyn UserStore>,
    _admin: AdminAccess,
) -> Result<HttpResponse, HttpErrorResponse> {
    let all_users = match web::block(move || users.get_all_users()).await? {
        Ok(u) => u,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get users",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputUserList {
        users: all_users.into_iter().map(OutputUser::from).collect(),
    }))
}

/// Deletes every user that isn't an administrator. Their blogs are left in place.
pub async fn delete_all(
    users: web::Data<dyn UserStore>,
    admin: AdminAccess,
) -> Result<HttpResponse, HttpErrorResponse> {
    let deleted_count = match web::block(move || users.delete_all_non_admin_users()).await? {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete users",
            )));
        }
    };

    log::info!(
        "Administrator {} deleted {deleted_count} user(s)",
        admin.claims.user_id
    );

    Ok(HttpResponse::Ok().json(OutputMessage {
        message: format!("{deleted_count} row(s) deleted"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use blog_common::db::BlogStore;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use crate::handlers::test_utils::{bearer, init_app, read_json, register_user, TestContext};

    #[actix_web::test]
    async fn test_list_all_requires_admin() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let (_, user_token, _) = register_user(&ctx, "ivy", "password").await;

        let req = TestRequest::get().uri("/users").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::get()
            .uri("/users")
            .insert_header(bearer(&user_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::delete()
            .uri("/users")
            .insert_header(bearer(&user_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        assert_eq!(ctx.store.get_all_users().unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn test_list_all_omits_password_hashes() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let admin_id = ctx.store.create_user("root", "$argon2id$roothash", true).unwrap();
        let admin_token = ctx.issuer().issue_access_token(admin_id).unwrap();
        register_user(&ctx, "jack", "password").await;

        let req = TestRequest::get()
            .uri("/users")
            .insert_header(bearer(&admin_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: serde_json::Value = read_json(resp).await;
        let listed = body["users"].as_array().unwrap();
        assert_eq!(listed.len(), 2);

        assert_eq!(listed[0]["username"], "root");
        assert_eq!(listed[0]["is_admin"], true);
        assert_eq!(listed[1]["username"], "jack");
        assert_eq!(listed[1]["is_admin"], false);

        let raw = body.to_string();
        assert!(!raw.contains("password"));
        assert!(!raw.contains("argon2"));
    }

    #[actix_web::test]
    async fn test_delete_all_keeps_admins_and_blogs() {
        let ctx = TestContext::new();
        let app = init_app!(ctx);

        let admin_id = ctx.store.create_user("root", "hash", true).unwrap();
        let admin_token = ctx.issuer().issue_access_token(admin_id).unwrap();

        let (author_id, _, _) = register_user(&ctx, "kim", "password").await;
        register_user(&ctx, "lee", "password").await;

        let blog = ctx.store.create_blog(author_id, "Kim's post", "").unwrap();

        let req = TestRequest::delete()
            .uri("/users")
            .insert_header(bearer(&admin_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OutputMessage = read_json(resp).await;
        assert_eq!(body.message, "2 row(s) deleted");

        let remaining = ctx.store.get_all_users().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, admin_id);

        let req = TestRequest::get()
            .uri(&format!("/blogapi/blogs/{}", blog.id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // The admin is still usable after the wipe
        let req = TestRequest::delete()
            .uri("/users")
            .insert_header(bearer(&admin_token))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let body: OutputMessage = read_json(resp).await;
        assert_eq!(body.message, "0 row(s) deleted");
    }
}
