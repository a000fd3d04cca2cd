use diesel::{AsChangeset, Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::schema::blogs;

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable, QueryableByName)]
#[diesel(table_name = blogs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Blog {
    pub id: i32,
    pub author_id: i32,
    pub title: String,
    pub content: String,
    pub last_updated: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blogs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBlog<'a> {
    pub author_id: i32,
    pub title: &'a str,
    pub content: &'a str,
    pub last_updated: SystemTime,
}

/// Fields left as `None` are not written.
#[derive(Clone, Debug, Default, AsChangeset)]
#[diesel(table_name = blogs)]
pub struct BlogChanges {
    pub title: Option<String>,
    pub content: Option<String>,
}
