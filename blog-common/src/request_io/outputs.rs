use serde::{Deserialize, Serialize};
use std::time::UNIX_EPOCH;

use crate::models::blog::Blog;
use crate::models::user::User;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputMessage {
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputTokenPair {
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputAccessToken {
    pub access_token: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputBlog {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub author_id: i32,
    pub uri: String,
    /// Milliseconds since the Unix epoch
    pub last_updated: u64,
}

impl From<Blog> for OutputBlog {
    fn from(blog: Blog) -> Self {
        let last_updated = blog
            .last_updated
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        OutputBlog {
            uri: format!("/blogapi/blogs/{}", blog.id),
            id: blog.id,
            title: blog.title,
            content: blog.content,
            author_id: blog.author_id,
            last_updated,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSingleBlog {
    pub blog: OutputBlog,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputBlogList {
    pub blogs: Vec<OutputBlog>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputDeletedBlog {
    pub deleted: OutputBlog,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputUser {
    pub id: i32,
    pub username: String,
    pub is_admin: bool,
}

impl From<User> for OutputUser {
    fn from(user: User) -> Self {
        OutputUser {
            id: user.id,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputUserList {
    pub users: Vec<OutputUser>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ErrorType {
    IncorrectlyFormed,
    ConflictWithExisting,
    IncorrectCredential,
    BadToken,
    UserDisallowed,
    DoesNotExist,
    InputTooLarge,
    InternalError,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerErrorResponse {
    pub error_type: ErrorType,
    pub message: String,
}
