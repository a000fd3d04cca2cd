use blog_common::db::{BlogStore, DaoError, UserStore};
use blog_common::request_io::inputs::{CredentialPair, InputBlog};
use blog_common::validators::Validity;

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::utils::password::{HashingError, PasswordHasher};

#[derive(Debug)]
pub enum BootstrapError {
    Dao(DaoError),
    Hashing(HashingError),
    InvalidAdmin(&'static str),
    SeedFile(String),
}

impl std::error::Error for BootstrapError {}

impl fmt::Display for BootstrapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootstrapError::Dao(e) => write!(f, "BootstrapError: {e}"),
            BootstrapError::Hashing(e) => write!(f, "BootstrapError: {e}"),
            BootstrapError::InvalidAdmin(msg) => {
                write!(f, "BootstrapError: Invalid admin credentials: {msg}")
            }
            BootstrapError::SeedFile(msg) => {
                write!(f, "BootstrapError: Failed to load seed blogs: {msg}")
            }
        }
    }
}

impl From<DaoError> for BootstrapError {
    fn from(error: DaoError) -> Self {
        BootstrapError::Dao(error)
    }
}

impl From<HashingError> for BootstrapError {
    fn from(error: HashingError) -> Self {
        BootstrapError::Hashing(error)
    }
}

#[derive(Debug, Default)]
pub struct BootstrapSummary {
    pub admin_id: Option<i32>,
    pub blogs_created: usize,
}

/// Ensures the configured administrator exists and loads any seed blogs. Safe to run on every
/// startup: existing users and titles are left alone.
pub async fn initialize(
    users: &dyn UserStore,
    blogs: &dyn BlogStore,
    password_hasher: Arc<PasswordHasher>,
    admin: Option<CredentialPair>,
    seed_blogs_path: Option<&Path>,
) -> Result<BootstrapSummary, BootstrapError> {
    let mut summary = BootstrapSummary::default();

    if let Some(admin) = admin {
        summary.admin_id = Some(ensure_admin(users, password_hasher, admin).await?);
    }

    if let Some(path) = seed_blogs_path {
        let Some(author_id) = summary.admin_id else {
            log::warn!(
                "Seed blogs at {} were not loaded because no administrator is configured",
                path.display()
            );
            return Ok(summary);
        };

        summary.blogs_created = seed_blogs(blogs, author_id, path)?;
    }

    Ok(summary)
}

async fn ensure_admin(
    users: &dyn UserStore,
    password_hasher: Arc<PasswordHasher>,
    admin: CredentialPair,
) -> Result<i32, BootstrapError> {
    if let Validity::Invalid(msg) = admin.validate() {
        return Err(BootstrapError::InvalidAdmin(msg));
    }

    match users.get_user_by_username(&admin.username) {
        Ok(existing) => {
            if !existing.is_admin {
                log::warn!(
                    "User {} already exists but is not an administrator",
                    existing.username
                );
            }

            return Ok(existing.id);
        }
        Err(e) if e.is_not_found() => (),
        Err(e) => return Err(e.into()),
    }

    let password_hash = password_hasher.hash(admin.password).await?;
    let admin_id = users.create_user(&admin.username, &password_hash, true)?;

    log::info!("Created administrator {} with ID {admin_id}", admin.username);

    Ok(admin_id)
}

fn seed_blogs(
    blogs: &dyn BlogStore,
    author_id: i32,
    path: &Path,
) -> Result<usize, BootstrapError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| BootstrapError::SeedFile(format!("{}: {e}", path.display())))?;
    let seeds: Vec<InputBlog> = serde_json::from_str(&raw)
        .map_err(|e| BootstrapError::SeedFile(format!("{}: {e}", path.display())))?;

    let mut created = 0;

    for seed in seeds {
        if let Validity::Invalid(msg) = seed.validate() {
            log::warn!("Skipping seed blog ({}): {msg}", seed.title);
            continue;
        }

        let content = seed.content.unwrap_or_default();

        match blogs.create_blog(author_id, &seed.title, &content) {
            Ok(_) => created += 1,
            Err(e) if e.is_unique_violation() => {
                log::debug!("Seed blog ({}) already exists", seed.title);
            }
            Err(e) => return Err(e.into()),
        }
    }

    log::info!("Seeded {created} blog(s) from {}", path.display());

    Ok(created)
}
