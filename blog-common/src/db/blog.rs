use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{next_write_timestamp, BlogStore, DaoError, DbThreadPool};
use crate::models::blog::{Blog, BlogChanges, NewBlog};
use crate::schema::blogs as blog_fields;
use crate::schema::blogs::dsl::blogs;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }
}

impl BlogStore for Dao {
    fn get_all_blogs(&self) -> Result<Vec<Blog>, DaoError> {
        Ok(blogs
            .order(blog_fields::id.asc())
            .load::<Blog>(&mut self.db_thread_pool.get()?)?)
    }

    fn get_blog(&self, blog_id: i32) -> Result<Blog, DaoError> {
        Ok(blogs
            .find(blog_id)
            .get_result::<Blog>(&mut self.db_thread_pool.get()?)?)
    }

    fn get_blog_by_title(&self, title: &str) -> Result<Blog, DaoError> {
        Ok(blogs
            .filter(blog_fields::title.eq(title))
            .get_result::<Blog>(&mut self.db_thread_pool.get()?)?)
    }

    fn create_blog(&self, author_id: i32, title: &str, content: &str) -> Result<Blog, DaoError> {
        let new_blog = NewBlog {
            author_id,
            title,
            content,
            last_updated: SystemTime::now(),
        };

        Ok(dsl::insert_into(blogs)
            .values(&new_blog)
            .get_result::<Blog>(&mut self.db_thread_pool.get()?)?)
    }

    fn update_blog(
        &self,
        blog_id: i32,
        author_id: i32,
        changes: &BlogChanges,
    ) -> Result<Blog, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let blog = blogs
                    .find(blog_id)
                    .for_update()
                    .get_result::<Blog>(conn)?;

                if blog.author_id != author_id {
                    return Err(DaoError::WontRunQuery);
                }

                let updated = dsl::update(blogs.find(blog_id))
                    .set((
                        changes,
                        blog_fields::last_updated.eq(next_write_timestamp(blog.last_updated)),
                    ))
                    .get_result::<Blog>(conn)?;

                Ok(updated)
            })
    }

    fn delete_blog(&self, blog_id: i32, author_id: i32) -> Result<Option<Blog>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let Some(blog) = blogs
                    .find(blog_id)
                    .for_update()
                    .get_result::<Blog>(conn)
                    .optional()?
                else {
                    return Ok(None);
                };

                if blog.author_id != author_id {
                    return Err(DaoError::WontRunQuery);
                }

                diesel::delete(blogs.find(blog_id)).execute(conn)?;

                Ok(Some(blog))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;

    #[test]
    #[ignore = "requires a PostgreSQL database"]
    fn test_create_and_update_blog() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let title = test_utils::unique_name("title");

        let blog = dao.create_blog(7, &title, "World").unwrap();
        assert_eq!(blog.author_id, 7);
        assert_eq!(blog.title, title);

        let err = dao.create_blog(8, &title, "Other").unwrap_err();
        assert!(err.is_unique_violation());

        let changes = BlogChanges {
            title: None,
            content: Some(String::from("new")),
        };

        let updated = dao.update_blog(blog.id, 7, &changes).unwrap();
        assert_eq!(updated.title, title);
        assert_eq!(updated.content, "new");
        assert_eq!(updated.author_id, 7);
        assert!(updated.last_updated > blog.last_updated);

        assert!(matches!(
            dao.update_blog(blog.id, 8, &changes).unwrap_err(),
            DaoError::WontRunQuery
        ));

        dao.delete_blog(blog.id, 7).unwrap();
    }

    #[test]
    #[ignore = "requires a PostgreSQL database"]
    fn test_delete_blog() {
        let dao = Dao::new(test_utils::db_thread_pool());
        let title = test_utils::unique_name("title");

        let blog = dao.create_blog(3, &title, "").unwrap();

        assert!(matches!(
            dao.delete_blog(blog.id, 4).unwrap_err(),
            DaoError::WontRunQuery
        ));

        let deleted = dao.delete_blog(blog.id, 3).unwrap().unwrap();
        assert_eq!(deleted.id, blog.id);

        assert!(dao.delete_blog(blog.id, 3).unwrap().is_none());
        assert!(dao.get_blog(blog.id).unwrap_err().is_not_found());
    }
}
