use blog_common::db::{BlogStore, DaoError};
use blog_common::models::blog::{Blog, BlogChanges};
use blog_common::request_io::inputs::{InputBlog, InputBlogChanges};
use blog_common::request_io::outputs::{
    OutputBlog, OutputBlogList, OutputDeletedBlog, OutputMessage, OutputSingleBlog,
};
use blog_common::validators::Validity;

use actix_web::{web, HttpResponse};

use crate::handlers::error::HttpErrorResponse;
use crate::middleware::auth::{Access, VerifiedUser};

const NOT_AUTHOR_MSG: &str = "Only the author of a blog can modify it";

pub async fn list(blogs: web::Data<dyn BlogStore>) -> Result<HttpResponse, HttpErrorResponse> {
    let all_blogs = match web::block(move || blogs.get_all_blogs()).await? {
        Ok(b) => b,
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get blogs",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputBlogList {
        blogs: all_blogs.into_iter().map(OutputBlog::from).collect(),
    }))
}

pub async fn get(
    blogs: web::Data<dyn BlogStore>,
    blog_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let blog_id = blog_id.into_inner();

    let blog = match web::block(move || blogs.get_blog(blog_id)).await? {
        Ok(b) => b,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(format!(
                "No blog with ID {blog_id}"
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get blog",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputSingleBlog {
        blog: OutputBlog::from(blog),
    }))
}

pub async fn create(
    blogs: web::Data<dyn BlogStore>,
    author: VerifiedUser<Access>,
    new_blog: web::Json<InputBlog>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let new_blog = new_blog.into_inner();

    if let Validity::Invalid(msg) = new_blog.validate() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(msg)));
    }

    let author_id = author.user.id;

    let title = new_blog.title.clone();
    let blogs_ref = blogs.clone();

    match web::block(move || blogs_ref.get_blog_by_title(&title)).await? {
        Ok(existing) => {
            return Err(HttpErrorResponse::ConflictWithExisting(format!(
                "Blog with title ({}) already exists",
                existing.title
            )));
        }
        Err(e) if e.is_not_found() => (),
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to check for existing blog",
            )));
        }
    }

    let title = new_blog.title.clone();
    let content = new_blog.content.unwrap_or_default();

    let blog = match web::block(move || blogs.create_blog(author_id, &title, &content)).await? {
        Ok(b) => b,
        Err(e) if e.is_unique_violation() => {
            return Err(HttpErrorResponse::ConflictWithExisting(format!(
                "Blog with title ({}) already exists",
                new_blog.title
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to create blog",
            )));
        }
    };

    Ok(HttpResponse::Created().json(OutputSingleBlog {
        blog: OutputBlog::from(blog),
    }))
}

pub async fn update(
    blogs: web::Data<dyn BlogStore>,
    author: VerifiedUser<Access>,
    blog_id: web::Path<i32>,
    changes: web::Json<InputBlogChanges>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let blog_id = blog_id.into_inner();
    let changes = BlogChanges::from(validated(changes.into_inner())?);
    let author_id = author.user.id;

    let new_title = changes.title.clone();
    let blogs_ref = blogs.clone();

    let lookup = web::block(move || -> Result<(Blog, Option<Blog>), DaoError> {
        let blog = blogs_ref.get_blog(blog_id)?;

        let same_title = match new_title {
            Some(title) => match blogs_ref.get_blog_by_title(&title) {
                Ok(b) => Some(b),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok((blog, same_title))
    })
    .await?;

    let (blog, same_title) = match lookup {
        Ok(l) => l,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(format!(
                "No blog with ID {blog_id}"
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to get blog",
            )));
        }
    };

    if blog.author_id != author_id {
        return Err(HttpErrorResponse::UserDisallowed(String::from(NOT_AUTHOR_MSG)));
    }

    if let Some(other) = same_title.filter(|b| b.id != blog_id) {
        return Err(HttpErrorResponse::ConflictWithExisting(format!(
            "Blog with title ({}) already exists",
            other.title
        )));
    }

    let updated = match web::block(move || blogs.update_blog(blog_id, author_id, &changes)).await?
    {
        Ok(b) => b,
        Err(e) if e.is_not_found() => {
            return Err(HttpErrorResponse::DoesNotExist(format!(
                "No blog with ID {blog_id}"
            )));
        }
        Err(DaoError::WontRunQuery) => {
            return Err(HttpErrorResponse::UserDisallowed(String::from(NOT_AUTHOR_MSG)));
        }
        Err(e) if e.is_unique_violation() => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "Another blog already has this title",
            )));
        }
        Err(e) => {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to update blog",
            )));
        }
    };

    Ok(HttpResponse::Ok().json(OutputSingleBlog {
        blog: OutputBlog::from(updated),
    }))
}

pub async fn delete(
    blogs: web::Data<dyn BlogStore>,
    author: VerifiedUser<Access>,
    blog_id: web::Path<i32>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let blog_id = blog_id.into_inner();
    let author_id = author.user.id;

    match web::block(move || blogs.delete_blog(blog_id, author_id)).await? {
        Ok(Some(deleted)) => Ok(HttpResponse::Ok().json(OutputDeletedBlog {
            deleted: OutputBlog::from(deleted),
        })),
        Ok(None) => Ok(HttpResponse::Ok().json(OutputMessage {
            message: format!("No blog with ID {blog_id}"),
        })),
        Err(DaoError::WontRunQuery) => Err(HttpErrorResponse::UserDisallowed(String::from(
            NOT_AUTHOR_MSG,
        ))),
        Err(e) => {
            log::error!("{e}");
            Err(HttpErrorResponse::InternalError(String::from(
                "Failed to delete blog",
            )))
        }
    }
}

fn validated(changes: InputBlogChanges) -> Result<InputBlogChanges, HttpErrorResponse> {
    match changes.validate() {
        Validity::Valid => Ok(changes),
        Validity::Invalid(msg) => Err(HttpErrorResponse::IncorrectlyFormed(String::from(msg))),
    }
}
