use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::fmt;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::models::blog::{Blog, BlogChanges};
use crate::models::user::User;

pub mod auth;
pub mod blog;
pub mod job_registry;
pub mod memory;
pub mod user;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub type DbThreadPool = diesel::r2d2::Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub fn create_db_thread_pool(
    database_uri: &str,
    max_db_connections: u32,
    idle_timeout: Duration,
) -> Result<DbThreadPool, DaoError> {
    Ok(r2d2::Pool::builder()
        .max_size(max_db_connections)
        .idle_timeout(Some(idle_timeout))
        .build(ConnectionManager::<PgConnection>::new(database_uri))?)
}

/// Brings the schema up to date. Returns the number of migrations applied.
pub fn run_migrations(db_thread_pool: &DbThreadPool) -> Result<usize, DaoError> {
    let mut db_connection = db_thread_pool.get()?;

    let applied = db_connection
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DaoError::MigrationFailure(e.to_string()))?;

    for version in applied.iter() {
        log::info!("Applied migration {version}");
    }

    Ok(applied.len())
}

pub trait UserStore: Send + Sync {
    fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> Result<i32, DaoError>;
    fn get_user(&self, user_id: i32) -> Result<User, DaoError>;
    fn get_user_by_username(&self, username: &str) -> Result<User, DaoError>;
    fn get_all_users(&self) -> Result<Vec<User>, DaoError>;
    fn delete_all_non_admin_users(&self) -> Result<usize, DaoError>;
}

pub trait BlogStore: Send + Sync {
    fn get_all_blogs(&self) -> Result<Vec<Blog>, DaoError>;
    fn get_blog(&self, blog_id: i32) -> Result<Blog, DaoError>;
    fn get_blog_by_title(&self, title: &str) -> Result<Blog, DaoError>;
    fn create_blog(&self, author_id: i32, title: &str, content: &str) -> Result<Blog, DaoError>;

    /// Fails with `DaoError::WontRunQuery` if `author_id` doesn't own the blog.
    fn update_blog(
        &self,
        blog_id: i32,
        author_id: i32,
        changes: &BlogChanges,
    ) -> Result<Blog, DaoError>;

    /// Returns `None` if there was no blog with the given ID. Fails with
    /// `DaoError::WontRunQuery` if `author_id` doesn't own the blog.
    fn delete_blog(&self, blog_id: i32, author_id: i32) -> Result<Option<Blog>, DaoError>;
}

pub trait RevocationStore: Send + Sync {
    /// Recording the same jti twice is not an error.
    fn revoke_token(&self, jti: Uuid, token_expiration: u64) -> Result<(), DaoError>;
    fn is_token_revoked(&self, jti: Uuid) -> Result<bool, DaoError>;
    fn clear_all_expired_tokens(&self) -> Result<usize, DaoError>;
}

pub trait JobRegistryStore: Send + Sync {
    fn get_job_last_run_timestamp(&self, job_name: &str) -> Result<Option<SystemTime>, DaoError>;
    fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError>;
}

/// The timestamp a write should stamp on a row last written at `previous`. Never
/// returns a time at or before `previous`, even if the clock hasn't moved forward.
pub(crate) fn next_write_timestamp(previous: SystemTime) -> SystemTime {
    SystemTime::now().max(previous + Duration::from_micros(1))
}

#[derive(Debug)]
pub enum DaoError {
    DbThreadPoolFailure(r2d2::Error),
    QueryFailure(diesel::result::Error),
    MigrationFailure(String),
    WontRunQuery, // This error indicates that the DAO refuses to run a query
}

impl DaoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::QueryFailure(diesel::result::Error::NotFound))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }
}

impl std::error::Error for DaoError {}

impl fmt::Display for DaoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaoError::DbThreadPoolFailure(e) => {
                write!(f, "DaoError: Failed to obtain DB connection: {e}")
            }
            DaoError::QueryFailure(e) => {
                write!(f, "DaoError: Query failed: {e}")
            }
            DaoError::MigrationFailure(msg) => {
                write!(f, "DaoError: Migration failed: {msg}")
            }
            DaoError::WontRunQuery => {
                write!(f, "DaoError: DAO will not run query")
            }
        }
    }
}

impl From<r2d2::Error> for DaoError {
    fn from(error: r2d2::Error) -> Self {
        DaoError::DbThreadPoolFailure(error)
    }
}

impl From<diesel::result::Error> for DaoError {
    fn from(error: diesel::result::Error) -> Self {
        DaoError::QueryFailure(error)
    }
}
