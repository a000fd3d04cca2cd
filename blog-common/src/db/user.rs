use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool, UserStore};
use crate::models::user::{NewUser, User};
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

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

impl UserStore for Dao {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i32, DaoError> {
        let new_user = NewUser {
            username,
            password_hash,
            is_admin,
            created_timestamp: SystemTime::now(),
        };

        Ok(dsl::insert_into(users)
            .values(&new_user)
            .returning(user_fields::id)
            .get_result::<i32>(&mut self.db_thread_pool.get()?)?)
    }

    fn get_user(&self, user_id: i32) -> Result<User, DaoError> {
        Ok(users
            .find(user_id)
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    fn get_user_by_username(&self, username: &str) -> Result<User, DaoError> {
        Ok(users
            .filter(user_fields::username.eq(username))
            .get_result::<User>(&mut self.db_thread_pool.get()?)?)
    }

    fn get_all_users(&self) -> Result<Vec<User>, DaoError> {
        Ok(users
            .order(user_fields::id.asc())
            .load::<User>(&mut self.db_thread_pool.get()?)?)
    }

    fn delete_all_non_admin_users(&self) -> Result<usize, DaoError> {
        Ok(
            diesel::delete(users.filter(user_fields::is_admin.eq(false)))
                .execute(&mut self.db_thread_pool.get()?)?,
        )
    }
}
