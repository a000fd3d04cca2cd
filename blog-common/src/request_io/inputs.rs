use serde::{Deserialize, Serialize};

use crate::models::blog::BlogChanges;
use crate::validators::{self, Validity};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub username: String,
    pub password: String,
}

impl CredentialPair {
    pub fn validate(&self) -> Validity {
        validators::validate_username(&self.username)
            .and(|| validators::validate_password(&self.password))
    }
}

/// Any `author_id` a client sends is ignored; the author comes from the access token.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InputBlog {
    pub title: String,
    pub content: Option<String>,
}

impl InputBlog {
    pub fn validate(&self) -> Validity {
        validators::validate_blog_title(&self.title).and(|| match &self.content {
            Some(content) => validators::validate_blog_content(content),
            None => Validity::Valid,
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct InputBlogChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl InputBlogChanges {
    pub fn validate(&self) -> Validity {
        let title_validity = match &self.title {
            Some(title) => validators::validate_blog_title(title),
            None => Validity::Valid,
        };

        title_validity.and(|| match &self.content {
            Some(content) => validators::validate_blog_content(content),
            None => Validity::Valid,
        })
    }
}

impl From<InputBlogChanges> for BlogChanges {
    fn from(input: InputBlogChanges) -> Self {
        BlogChanges {
            title: input.title,
            content: input.content,
        }
    }
}
