//! A process-local store with the same semantics as the PostgreSQL DAOs, including
//! uniqueness violations and not-found errors. Used by tests and by the server's
//! `--in-memory` mode. Nothing is persisted.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::db::{
    next_write_timestamp, BlogStore, DaoError, JobRegistryStore, RevocationStore, UserStore,
};
use crate::models::blog::{Blog, BlogChanges};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    next_user_id: i32,
    blogs: BTreeMap<i32, Blog>,
    next_blog_id: i32,
    revoked_tokens: HashMap<Uuid, SystemTime>,
    job_registry: HashMap<String, SystemTime>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A panic while holding the lock can't leave the maps half-written
        match self.tables.lock() {
            Ok(t) => t,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn unique_violation(constraint: &str) -> DaoError {
    DaoError::QueryFailure(DieselError::DatabaseError(
        DatabaseErrorKind::UniqueViolation,
        Box::new(format!("duplicate key value violates unique constraint \"{constraint}\"")),
    ))
}

fn not_found() -> DaoError {
    DaoError::QueryFailure(DieselError::NotFound)
}

impl UserStore for MemoryStore {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i32, DaoError> {
        let mut tables = self.tables();

        if tables.users.values().any(|u| u.username == username) {
            return Err(unique_violation("users_username_key"));
        }

        tables.next_user_id += 1;
        let id = tables.next_user_id;

        tables.users.insert(
            id,
            User {
                id,
                username: String::from(username),
                password_hash: String::from(password_hash),
                is_admin,
                created_timestamp: SystemTime::now(),
            },
        );

        Ok(id)
    }

    fn get_user(&self, user_id: i32) -> Result<User, DaoError> {
        self.tables()
            .users
            .get(&user_id)
            .cloned()
            .ok_or_else(not_found)
    }

    fn get_user_by_username(&self, username: &str) -> Result<User, DaoError> {
        self.tables()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(not_found)
    }

    fn get_all_users(&self) -> Result<Vec<User>, DaoError> {
        Ok(self.tables().users.values().cloned().collect())
    }

    fn delete_all_non_admin_users(&self) -> Result<usize, DaoError> {
        let mut tables = self.tables();
        let before = tables.users.len();
        tables.users.retain(|_, u| u.is_admin);
        Ok(before - tables.users.len())
    }
}

impl BlogStore for MemoryStore {
    fn get_all_blogs(&self) -> Result<Vec<Blog>, DaoError> {
        Ok(self.tables().blogs.values().cloned().collect())
    }

    fn get_blog(&self, blog_id: i32) -> Result<Blog, DaoError> {
        self.tables()
            .blogs
            .get(&blog_id)
            .cloned()
            .ok_or_else(not_found)
    }

    fn get_blog_by_title(&self, title: &str) -> Result<Blog, DaoError> {
        self.tables()
            .blogs
            .values()
            .find(|b| b.title == title)
            .cloned()
            .ok_or_else(not_found)
    }

    fn create_blog(&self, author_id: i32, title: &str, content: &str) -> Result<Blog, DaoError> {
        let mut tables = self.tables();

        if tables.blogs.values().any(|b| b.title == title) {
            return Err(unique_violation("blogs_title_key"));
        }

        tables.next_blog_id += 1;
        let blog = Blog {
            id: tables.next_blog_id,
            author_id,
            title: String::from(title),
            content: String::from(content),
            last_updated: SystemTime::now(),
        };

        tables.blogs.insert(blog.id, blog.clone());

        Ok(blog)
    }

    fn update_blog(
        &self,
        blog_id: i32,
        author_id: i32,
        changes: &BlogChanges,
    ) -> Result<Blog, DaoError> {
        let mut tables = self.tables();

        let blog = tables.blogs.get(&blog_id).ok_or_else(not_found)?;

        if blog.author_id != author_id {
            return Err(DaoError::WontRunQuery);
        }

        if let Some(title) = &changes.title {
            if tables
                .blogs
                .values()
                .any(|b| b.id != blog_id && &b.title == title)
            {
                return Err(unique_violation("blogs_title_key"));
            }
        }

        let blog = tables.blogs.get_mut(&blog_id).ok_or_else(not_found)?;

        if let Some(title) = &changes.title {
            blog.title = title.clone();
        }

        if let Some(content) = &changes.content {
            blog.content = content.clone();
        }

        blog.last_updated = next_write_timestamp(blog.last_updated);

        Ok(blog.clone())
    }

    fn delete_blog(&self, blog_id: i32, author_id: i32) -> Result<Option<Blog>, DaoError> {
        let mut tables = self.tables();

        match tables.blogs.get(&blog_id) {
            None => Ok(None),
            Some(blog) if blog.author_id != author_id => Err(DaoError::WontRunQuery),
            Some(_) => Ok(tables.blogs.remove(&blog_id)),
        }
    }
}

impl RevocationStore for MemoryStore {
    fn revoke_token(&self, jti: Uuid, token_expiration: u64) -> Result<(), DaoError> {
        self.tables()
            .revoked_tokens
            .entry(jti)
            .or_insert(UNIX_EPOCH + Duration::from_secs(token_expiration));

        Ok(())
    }

    fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DaoError> {
        Ok(self.tables().revoked_tokens.contains_key(&jti))
    }

    fn clear_all_expired_tokens(&self) -> Result<usize, DaoError> {
        let now = SystemTime::now();
        let mut tables = self.tables();
        let before = tables.revoked_tokens.len();
        tables.revoked_tokens.retain(|_, expiration| *expiration >= now);
        Ok(before - tables.revoked_tokens.len())
    }
}

impl JobRegistryStore for MemoryStore {
    fn get_job_last_run_timestamp(&self, job_name: &str) -> Result<Option<SystemTime>, DaoError> {
        Ok(self.tables().job_registry.get(job_name).copied())
    }

    fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError> {
        self.tables()
            .job_registry
            .insert(String::from(job_name), timestamp);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unix_secs(time: SystemTime) -> u64 {
        time.duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    #[test]
    fn test_duplicate_username() {
        let store = MemoryStore::new();

        let id = store.create_user("alice", "hash1", false).unwrap();
        let err = store.create_user("alice", "hash2", false).unwrap_err();
        assert!(err.is_unique_violation());

        let user = store.get_user(id).unwrap();
        assert_eq!(user.password_hash, "hash1");
        assert_eq!(store.get_all_users().unwrap().len(), 1);
    }

    #[test]
    fn test_delete_all_non_admin_users() {
        let store = MemoryStore::new();

        store.create_user("admin", "h", true).unwrap();
        store.create_user("bob", "h", false).unwrap();
        store.create_user("carol", "h", false).unwrap();

        assert_eq!(store.delete_all_non_admin_users().unwrap(), 2);

        let remaining = store.get_all_users().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].username, "admin");
        assert!(store.get_user_by_username("bob").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_title_does_not_overwrite() {
        let store = MemoryStore::new();

        let first = store.create_blog(1, "T", "first").unwrap();
        let err = store.create_blog(2, "T", "second").unwrap_err();
        assert!(err.is_unique_violation());

        let stored = store.get_blog(first.id).unwrap();
        assert_eq!(stored.content, "first");
        assert_eq!(stored.author_id, 1);
    }

    #[test]
    fn test_partial_update() {
        let store = MemoryStore::new();
        let blog = store.create_blog(1, "Hello", "World").unwrap();

        let changes = BlogChanges {
            title: None,
            content: Some(String::from("new")),
        };

        let updated = store.update_blog(blog.id, 1, &changes).unwrap();
        assert_eq!(updated.title, "Hello");
        assert_eq!(updated.content, "new");
        assert!(updated.last_updated > blog.last_updated);

        let again = store.update_blog(blog.id, 1, &BlogChanges::default()).unwrap();
        assert_eq!(again.content, "new");
        assert!(again.last_updated > updated.last_updated);
    }

    #[test]
    fn test_update_title_conflicts() {
        let store = MemoryStore::new();
        let a = store.create_blog(1, "A", "").unwrap();
        store.create_blog(1, "B", "").unwrap();

        let rename_to_b = BlogChanges {
            title: Some(String::from("B")),
            content: None,
        };
        assert!(store
            .update_blog(a.id, 1, &rename_to_b)
            .unwrap_err()
            .is_unique_violation());

        let keep_own_title = BlogChanges {
            title: Some(String::from("A")),
            content: Some(String::from("x")),
        };
        assert_eq!(
            store.update_blog(a.id, 1, &keep_own_title).unwrap().content,
            "x"
        );
    }

    #[test]
    fn test_only_author_can_mutate() {
        let store = MemoryStore::new();
        let blog = store.create_blog(1, "Mine", "").unwrap();

        assert!(matches!(
            store
                .update_blog(blog.id, 2, &BlogChanges::default())
                .unwrap_err(),
            DaoError::WontRunQuery
        ));
        assert!(matches!(
            store.delete_blog(blog.id, 2).unwrap_err(),
            DaoError::WontRunQuery
        ));

        assert_eq!(store.get_blog(blog.id).unwrap().author_id, 1);
    }

    #[test]
    fn test_delete_missing_blog_is_noop() {
        let store = MemoryStore::new();
        assert!(store.delete_blog(42, 1).unwrap().is_none());

        let blog = store.create_blog(1, "Gone", "").unwrap();
        assert_eq!(store.delete_blog(blog.id, 1).unwrap().unwrap().id, blog.id);
        assert!(store.get_blog(blog.id).unwrap_err().is_not_found());
        assert!(store.update_blog(blog.id, 1, &BlogChanges::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_revocation_and_pruning() {
        let store = MemoryStore::new();

        let expired = Uuid::now_v7();
        let live = Uuid::now_v7();

        store
            .revoke_token(expired, unix_secs(SystemTime::now() - Duration::from_secs(60)))
            .unwrap();
        store
            .revoke_token(live, unix_secs(SystemTime::now() + Duration::from_secs(60)))
            .unwrap();
        store
            .revoke_token(live, unix_secs(SystemTime::now() + Duration::from_secs(60)))
            .unwrap();

        assert!(store.is_token_revoked(expired).unwrap());
        assert!(store.is_token_revoked(live).unwrap());
        assert!(!store.is_token_revoked(Uuid::now_v7()).unwrap());

        assert_eq!(store.clear_all_expired_tokens().unwrap(), 1);

        assert!(!store.is_token_revoked(expired).unwrap());
        assert!(store.is_token_revoked(live).unwrap());
    }

    #[test]
    fn test_job_registry() {
        let store = MemoryStore::new();
        assert!(store.get_job_last_run_timestamp("job").unwrap().is_none());

        let now = SystemTime::now();
        store.set_job_last_run_timestamp("job", now).unwrap();
        assert_eq!(store.get_job_last_run_timestamp("job").unwrap(), Some(now));
    }
}
